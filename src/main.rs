use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use solace_backend::{BackendConfig, HttpBackend};
use solace_core::analysis::WorkflowKind;
use solace_core::events::ChatEvent;
use solace_engine::{ChatOrchestrator, OrchestratorConfig, WorkflowHub};
use solace_store::ExchangeStore;
use solace_telemetry::{init_telemetry, MetricsRecorder, TelemetryConfig};

/// Line-oriented companion chat client.
#[derive(Parser, Debug)]
#[command(name = "solace")]
struct Args {
    /// Base URL of the companion service.
    #[arg(long, env = "SOLACE_BACKEND_URL", default_value = "http://127.0.0.1:8787")]
    backend_url: String,

    /// Emit JSON-formatted log lines.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_telemetry(&TelemetryConfig {
        json_output: args.json_logs,
        ..Default::default()
    });
    tracing::info!(backend = %args.backend_url, "starting solace client");

    let (event_tx, _) = broadcast::channel::<ChatEvent>(1024);

    let backend = Arc::new(HttpBackend::new(BackendConfig {
        base_url: args.backend_url,
        ..Default::default()
    }));
    let store = Arc::new(ExchangeStore::new(event_tx.clone()));
    let workflows = Arc::new(WorkflowHub::new(event_tx.clone()));
    let metrics = Arc::new(MetricsRecorder::new());

    let orchestrator = ChatOrchestrator::new(
        backend,
        Arc::clone(&store),
        Arc::clone(&workflows),
        event_tx.clone(),
        metrics,
        OrchestratorConfig::default(),
    );

    // Render conversation updates as they arrive
    let mut rx = event_tx.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                ChatEvent::ExchangeResolved { reply_text, .. } => {
                    println!("solace: {reply_text}");
                }
                ChatEvent::ExchangeFailed { message, .. } => {
                    println!("solace: {message}");
                }
                ChatEvent::PollAbandoned { .. } => {
                    println!("solace: still thinking about that one, it may arrive later");
                }
                ChatEvent::WorkflowActivated { kind, .. } => {
                    println!("[{kind} suggestion open: /confirm {kind} or /dismiss {kind}]");
                }
                _ => {}
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }
        if let Some(rest) = line.strip_prefix("/confirm ") {
            match rest.parse::<WorkflowKind>() {
                Ok(kind) => match workflows.confirm(kind) {
                    Some(_) => println!("[{kind} confirmed]"),
                    None => println!("[no open {kind} suggestion]"),
                },
                Err(e) => println!("[{e}]"),
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("/dismiss ") {
            match rest.parse::<WorkflowKind>() {
                Ok(kind) => {
                    if !workflows.dismiss(kind) {
                        println!("[no open {kind} suggestion]");
                    }
                }
                Err(e) => println!("[{e}]"),
            }
            continue;
        }

        if let Err(e) = orchestrator.send(&line).await {
            tracing::warn!(error = %e, "message rejected");
        }
    }

    store.close();
    printer.abort();
    tracing::info!("shutting down");
    Ok(())
}
