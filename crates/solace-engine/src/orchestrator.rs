//! The send path, the only mutating entry point for the chat surface.
//!
//! `send` creates a pending exchange, submits the message, and either
//! resolves directly (inline answer) or hands the deferred task handle to
//! the poller on a spawned continuation. All terminal outcomes flow
//! through the `ResultDispatcher`.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::warn;

use solace_core::backend::{Backend, SubmitOutcome};
use solace_core::events::ChatEvent;
use solace_core::ids::{ExchangeId, TaskId};
use solace_store::ExchangeStore;
use solace_telemetry::MetricsRecorder;

use crate::dispatcher::{ResultDispatcher, TerminalResult};
use crate::error::EngineError;
use crate::poller::{PollOutcome, PollerConfig, TaskPoller};
use crate::workflows::WorkflowHub;

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// How many recent resolved turns accompany each submission.
    pub context_turns: usize,
    pub poller: PollerConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            context_turns: 10,
            poller: PollerConfig::default(),
        }
    }
}

pub struct ChatOrchestrator {
    backend: Arc<dyn Backend>,
    store: Arc<ExchangeStore>,
    dispatcher: Arc<ResultDispatcher>,
    poller: Arc<TaskPoller>,
    event_tx: broadcast::Sender<ChatEvent>,
    metrics: Arc<MetricsRecorder>,
    active_tasks: Arc<DashMap<ExchangeId, TaskId>>,
    config: OrchestratorConfig,
}

impl ChatOrchestrator {
    pub fn new(
        backend: Arc<dyn Backend>,
        store: Arc<ExchangeStore>,
        workflows: Arc<WorkflowHub>,
        event_tx: broadcast::Sender<ChatEvent>,
        metrics: Arc<MetricsRecorder>,
        config: OrchestratorConfig,
    ) -> Self {
        let dispatcher = Arc::new(ResultDispatcher::new(Arc::clone(&store), workflows));
        let poller = Arc::new(TaskPoller::new(Arc::clone(&backend), config.poller.clone()));
        Self {
            backend,
            store,
            dispatcher,
            poller,
            event_tx,
            metrics,
            active_tasks: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Submit a user message. The returned id identifies the pending
    /// exchange; its outcome (including submission failure) surfaces
    /// through the store, not the call site.
    pub async fn send(&self, user_text: &str) -> Result<ExchangeId, EngineError> {
        let text = user_text.trim();
        if text.is_empty() {
            return Err(EngineError::EmptyMessage);
        }

        let exchange_id = self.store.append(text)?;
        self.metrics.counter_inc("chat.exchanges.sent", &[], 1);

        let context = self.store.context(self.config.context_turns);

        match self.backend.submit(text, &context).await {
            Ok(SubmitOutcome::Immediate(payload)) => {
                self.metrics.counter_inc("chat.submit", &[("path", "immediate")], 1);
                self.dispatcher
                    .dispatch(&exchange_id, TerminalResult::Completed(payload));
            }
            Ok(SubmitOutcome::Deferred { task_id }) => {
                self.metrics.counter_inc("chat.submit", &[("path", "deferred")], 1);
                self.spawn_poll(exchange_id.clone(), task_id);
            }
            Err(e) => {
                warn!(
                    exchange_id = %exchange_id,
                    kind = e.error_kind(),
                    error = %e,
                    "submission failed"
                );
                self.metrics
                    .counter_inc("chat.submit", &[("path", "failed")], 1);
                self.dispatcher.dispatch(
                    &exchange_id,
                    TerminalResult::Failed { message: e.to_string() },
                );
            }
        }

        Ok(exchange_id)
    }

    /// Poll the deferred task on a spawned continuation and dispatch its
    /// outcome. The task record lives exactly as long as the poll.
    fn spawn_poll(&self, exchange_id: ExchangeId, task_id: TaskId) {
        self.active_tasks.insert(exchange_id.clone(), task_id.clone());

        let poller = Arc::clone(&self.poller);
        let dispatcher = Arc::clone(&self.dispatcher);
        let active_tasks = Arc::clone(&self.active_tasks);
        let metrics = Arc::clone(&self.metrics);
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            let task = poller.begin(task_id.clone(), exchange_id.clone());
            let result = poller.run(task).await;
            metrics.histogram_observe(
                "chat.poll.duration_ms",
                &[],
                started.elapsed().as_millis() as f64,
            );

            match result {
                Ok(PollOutcome::Completed(payload)) => {
                    dispatcher.dispatch(&exchange_id, TerminalResult::Completed(payload));
                }
                Ok(PollOutcome::TimedOut { attempts }) => {
                    // The computation may still land server-side; the
                    // client stops waiting and the exchange stays pending.
                    metrics.counter_inc("chat.poll.abandoned", &[], 1);
                    let _ = event_tx.send(ChatEvent::PollAbandoned {
                        exchange_id: exchange_id.clone(),
                        task_id,
                        attempts,
                    });
                }
                Err(e) => {
                    metrics.counter_inc("chat.poll.failed", &[("kind", e.error_kind())], 1);
                    dispatcher.dispatch(
                        &exchange_id,
                        TerminalResult::Failed { message: e.to_string() },
                    );
                }
            }

            active_tasks.remove(&exchange_id);
        });
    }

    /// Whether a background task is being polled for this exchange.
    pub fn is_polling(&self, exchange_id: &ExchangeId) -> bool {
        self.active_tasks.contains_key(exchange_id)
    }

    pub fn active_poll_count(&self) -> usize {
        self.active_tasks.len()
    }

    pub fn poller(&self) -> &TaskPoller {
        &self.poller
    }
}
