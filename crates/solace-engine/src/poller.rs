//! Polls a background analysis task until it reaches a terminal state.
//!
//! The schedule distinguishes three things the original flow conflated:
//! "still computing" (backoff and re-query, bounded), "gone or failed"
//! (stop immediately, retrying cannot help), and "transient network
//! error" (a small fixed-delay retry budget). Exhausting the attempt
//! budget while the task is still processing is a soft timeout: logged,
//! never surfaced as failure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use solace_core::analysis::AnalysisPayload;
use solace_core::backend::{Backend, TaskState};
use solace_core::errors::BackendError;
use solace_core::ids::{ExchangeId, TaskId};

/// Configuration for the polling schedule.
#[derive(Clone, Debug)]
pub struct PollerConfig {
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    pub max_attempts: u32,
    pub transient_retries: u32,
    pub transient_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            backoff_factor: 1.2,
            max_delay: Duration::from_millis(3000),
            max_attempts: 8,
            transient_retries: 3,
            transient_delay: Duration::from_millis(250),
        }
    }
}

impl PollerConfig {
    /// The next backoff delay: scale by the factor, cap at the max.
    /// Pure, so the schedule is testable without timers.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let scaled = current.as_millis() as f64 * self.backoff_factor;
        let capped = scaled.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Handle to one in-flight server-side computation. Created when a
/// submission defers; relinquished as soon as the owning exchange reaches
/// a terminal state or the poll is abandoned.
#[derive(Clone, Debug)]
pub struct BackgroundTask {
    pub task_id: TaskId,
    pub exchange_id: ExchangeId,
    /// Queries issued so far.
    pub attempt: u32,
    /// Delay before the next re-query, advanced by the backoff schedule.
    pub next_delay: Duration,
}

/// How a poll ended without error. A timed-out poll is not a failure:
/// the backend computation may still complete, the client just stops
/// waiting.
#[derive(Clone, Debug)]
pub enum PollOutcome {
    Completed(AnalysisPayload),
    TimedOut { attempts: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The task handle is unknown to the server; it was never properly
    /// created. Never retried.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The computation itself failed. Never retried.
    #[error("analysis task failed: {0}")]
    TaskFailed(String),

    /// A fatal backend error, or the transient retry budget ran out.
    #[error("backend error: {0}")]
    Backend(BackendError),
}

impl PollError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::TaskNotFound(_) => "task_not_found",
            Self::TaskFailed(_) => "task_failed",
            Self::Backend(_) => "backend",
        }
    }
}

pub struct TaskPoller {
    backend: Arc<dyn Backend>,
    config: PollerConfig,
    queries_issued: AtomicU64,
    transient_retries: AtomicU64,
}

impl TaskPoller {
    pub fn new(backend: Arc<dyn Backend>, config: PollerConfig) -> Self {
        Self {
            backend,
            config,
            queries_issued: AtomicU64::new(0),
            transient_retries: AtomicU64::new(0),
        }
    }

    pub fn with_defaults(backend: Arc<dyn Backend>) -> Self {
        Self::new(backend, PollerConfig::default())
    }

    /// Start tracking a deferred task handle.
    pub fn begin(&self, task_id: TaskId, exchange_id: ExchangeId) -> BackgroundTask {
        BackgroundTask {
            task_id,
            exchange_id,
            attempt: 0,
            next_delay: self.config.initial_delay,
        }
    }

    pub fn queries_issued(&self) -> u64 {
        self.queries_issued.load(Ordering::Relaxed)
    }

    pub fn transient_retries(&self) -> u64 {
        self.transient_retries.load(Ordering::Relaxed)
    }

    /// Drive a task to a terminal state or exhaustion.
    pub async fn run(&self, mut task: BackgroundTask) -> Result<PollOutcome, PollError> {
        let mut transient_failures = 0u32;

        loop {
            task.attempt += 1;
            self.queries_issued.fetch_add(1, Ordering::Relaxed);

            match self.backend.query_task(&task.task_id).await {
                Ok(TaskState::Completed(payload)) => {
                    debug!(
                        task_id = %task.task_id,
                        attempts = task.attempt,
                        "analysis task completed"
                    );
                    return Ok(PollOutcome::Completed(payload));
                }
                Ok(TaskState::Errored { message }) => {
                    return Err(PollError::TaskFailed(message));
                }
                Ok(TaskState::Processing) => {
                    if task.attempt >= self.config.max_attempts {
                        warn!(
                            task_id = %task.task_id,
                            exchange_id = %task.exchange_id,
                            attempts = task.attempt,
                            "task still processing after max attempts; giving up without error"
                        );
                        return Ok(PollOutcome::TimedOut { attempts: task.attempt });
                    }
                    tokio::time::sleep(task.next_delay).await;
                    task.next_delay = self.config.next_delay(task.next_delay);
                }
                Err(BackendError::TaskNotFound(_)) => {
                    return Err(PollError::TaskNotFound(task.task_id.clone()));
                }
                Err(e) if e.is_transient() => {
                    transient_failures += 1;
                    self.transient_retries.fetch_add(1, Ordering::Relaxed);
                    if transient_failures >= self.config.transient_retries {
                        return Err(PollError::Backend(e));
                    }
                    warn!(
                        task_id = %task.task_id,
                        failures = transient_failures,
                        error = %e,
                        "transient poll error; retrying"
                    );
                    tokio::time::sleep(self.config.transient_delay).await;
                }
                Err(e) => {
                    return Err(PollError::Backend(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solace_backend::{MockBackend, MockQuery};

    fn make_poller(queries: Vec<MockQuery>) -> TaskPoller {
        let backend = Arc::new(MockBackend::new(vec![], queries));
        TaskPoller::with_defaults(backend)
    }

    fn make_task(poller: &TaskPoller) -> BackgroundTask {
        poller.begin(TaskId::from_raw("srv-1"), ExchangeId::new())
    }

    #[tokio::test(start_paused = true)]
    async fn completed_after_backoff() {
        let poller = make_poller(vec![
            MockQuery::Processing,
            MockQuery::Processing,
            MockQuery::completed("finally"),
        ]);
        let task = make_task(&poller);

        let start = tokio::time::Instant::now();
        let outcome = poller.run(task).await.unwrap();

        match outcome {
            PollOutcome::Completed(payload) => assert_eq!(payload.reply_text, "finally"),
            PollOutcome::TimedOut { .. } => panic!("expected completion"),
        }
        assert_eq!(poller.queries_issued(), 3);
        // One 500ms sleep, then one 600ms sleep (500 * 1.2)
        assert_eq!(start.elapsed(), Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn still_processing_times_out_softly() {
        let poller = make_poller(vec![MockQuery::Processing; 8]);
        let task = make_task(&poller);

        let outcome = poller.run(task).await.unwrap();

        assert!(matches!(outcome, PollOutcome::TimedOut { attempts: 8 }));
        assert_eq!(poller.queries_issued(), 8);
    }

    #[tokio::test]
    async fn not_found_stops_after_one_query() {
        let poller = make_poller(vec![MockQuery::not_found("srv-1")]);
        let task = make_task(&poller);

        let err = poller.run(task).await.err().expect("expected error");
        assert!(matches!(err, PollError::TaskNotFound(_)));
        assert_eq!(poller.queries_issued(), 1);
    }

    #[tokio::test]
    async fn errored_task_stops_immediately() {
        let poller = make_poller(vec![
            MockQuery::Errored("model exploded".into()),
            MockQuery::completed("unreachable"),
        ]);
        let task = make_task(&poller);

        let err = poller.run(task).await.err().expect("expected error");
        assert!(matches!(err, PollError::TaskFailed(ref m) if m == "model exploded"));
        assert_eq!(poller.queries_issued(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_exhaust_retry_budget() {
        let network = || MockQuery::Error(BackendError::NetworkError("connection reset".into()));
        let poller = make_poller(vec![network(), network(), network(), MockQuery::completed("no")]);
        let task = make_task(&poller);

        let err = poller.run(task).await.err().expect("expected error");
        assert!(matches!(err, PollError::Backend(BackendError::NetworkError(_))));
        // Three total transient attempts, then give up
        assert_eq!(poller.queries_issued(), 3);
        assert_eq!(poller.transient_retries(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_error_then_recovery() {
        let poller = make_poller(vec![
            MockQuery::Error(BackendError::ServerError { status: 502, body: "bad gateway".into() }),
            MockQuery::Processing,
            MockQuery::completed("recovered"),
        ]);
        let task = make_task(&poller);

        let outcome = poller.run(task).await.unwrap();
        assert!(matches!(outcome, PollOutcome::Completed(_)));
        assert_eq!(poller.queries_issued(), 3);
    }

    #[tokio::test]
    async fn fatal_backend_error_not_retried() {
        let poller = make_poller(vec![MockQuery::Error(BackendError::InvalidRequest(
            "bad handle".into(),
        ))]);
        let task = make_task(&poller);

        let err = poller.run(task).await.err().expect("expected error");
        assert!(matches!(err, PollError::Backend(BackendError::InvalidRequest(_))));
        assert_eq!(poller.queries_issued(), 1);
    }

    #[test]
    fn next_delay_schedule() {
        let config = PollerConfig::default();
        let d1 = config.next_delay(Duration::from_millis(500));
        let d2 = config.next_delay(d1);
        assert_eq!(d1, Duration::from_millis(600));
        assert_eq!(d2, Duration::from_millis(720));
    }

    #[test]
    fn next_delay_caps_at_max() {
        let config = PollerConfig::default();
        assert_eq!(
            config.next_delay(Duration::from_millis(2900)),
            Duration::from_millis(3000)
        );
        assert_eq!(
            config.next_delay(Duration::from_millis(3000)),
            Duration::from_millis(3000)
        );
    }

    #[test]
    fn config_defaults() {
        let config = PollerConfig::default();
        assert_eq!(config.initial_delay, Duration::from_millis(500));
        assert!((config.backoff_factor - 1.2).abs() < f64::EPSILON);
        assert_eq!(config.max_delay, Duration::from_millis(3000));
        assert_eq!(config.max_attempts, 8);
        assert_eq!(config.transient_retries, 3);
        assert_eq!(config.transient_delay, Duration::from_millis(250));
    }

    #[test]
    fn begin_seeds_task_state() {
        let poller = make_poller(vec![]);
        let task = poller.begin(TaskId::from_raw("srv-7"), ExchangeId::new());
        assert_eq!(task.attempt, 0);
        assert_eq!(task.next_delay, Duration::from_millis(500));
        assert_eq!(task.task_id.as_str(), "srv-7");
    }

    #[test]
    fn poll_error_kinds() {
        assert_eq!(
            PollError::TaskNotFound(TaskId::from_raw("x")).error_kind(),
            "task_not_found"
        );
        assert_eq!(PollError::TaskFailed("m".into()).error_kind(), "task_failed");
        assert_eq!(
            PollError::Backend(BackendError::RateLimited).error_kind(),
            "backend"
        );
    }
}
