mod metrics;

pub use metrics::{HistogramSummary, MetricsRecorder};

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG env var.
    pub log_level: Level,
    /// Per-module level overrides (e.g. "solace_engine" => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    /// Emit JSON-formatted log lines instead of human-readable ones.
    pub json_output: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            json_output: false,
        }
    }
}

/// Build the env filter string from config. RUST_LOG wins when set.
fn build_filter(config: &TelemetryConfig) -> EnvFilter {
    let mut filter_str = config.log_level.to_string().to_lowercase();
    for (module, level) in &config.module_levels {
        filter_str.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str))
}

/// Initialize the telemetry subsystem. Call once at startup.
pub fn init_telemetry(config: &TelemetryConfig) {
    let env_filter = build_filter(config);

    if config.json_output {
        tracing_subscriber::fmt()
            .json()
            .with_target(true)
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_target(true)
            .with_env_filter(env_filter)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = TelemetryConfig::default();
        assert_eq!(config.log_level, Level::INFO);
        assert!(config.module_levels.is_empty());
        assert!(!config.json_output);
    }

    #[test]
    fn filter_includes_module_overrides() {
        // Only exercises the string path; EnvFilter itself is opaque.
        let config = TelemetryConfig {
            log_level: Level::WARN,
            module_levels: vec![("solace_engine".into(), Level::DEBUG)],
            json_output: false,
        };
        let mut filter_str = config.log_level.to_string().to_lowercase();
        for (module, level) in &config.module_levels {
            filter_str.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
        }
        assert_eq!(filter_str, "warn,solace_engine=debug");
    }
}
