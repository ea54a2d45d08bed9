use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use solace_core::analysis::AnalysisPayload;
use solace_core::backend::{Backend, SubmitOutcome, TaskState};
use solace_core::context::ConversationContext;
use solace_core::errors::BackendError;
use solace_core::ids::TaskId;

/// Pre-programmed submission responses for deterministic testing.
#[derive(Clone)]
pub enum MockSubmit {
    /// Answer inline with the given payload.
    Immediate(AnalysisPayload),
    /// Defer to a background task handle.
    Deferred(TaskId),
    /// Fail the submission call itself.
    Error(BackendError),
    /// Wait a duration, then yield the inner response.
    Delayed(Duration, Box<MockSubmit>),
}

impl MockSubmit {
    /// Convenience: an inline reply with no analysis.
    pub fn reply(text: &str) -> Self {
        Self::Immediate(AnalysisPayload::reply(text))
    }

    pub fn deferred(task_id: &str) -> Self {
        Self::Deferred(TaskId::from_raw(task_id))
    }

    pub fn delayed(delay: Duration, inner: MockSubmit) -> Self {
        Self::Delayed(delay, Box::new(inner))
    }
}

/// Pre-programmed task-query responses.
#[derive(Clone)]
pub enum MockQuery {
    Processing,
    Completed(AnalysisPayload),
    Errored(String),
    /// Fail the query call itself.
    Error(BackendError),
    Delayed(Duration, Box<MockQuery>),
}

impl MockQuery {
    /// Convenience: a completed task with a bare reply payload.
    pub fn completed(text: &str) -> Self {
        Self::Completed(AnalysisPayload::reply(text))
    }

    /// Convenience: the task handle is unknown to the server.
    pub fn not_found(task_id: &str) -> Self {
        Self::Error(BackendError::TaskNotFound(task_id.into()))
    }

    pub fn delayed(delay: Duration, inner: MockQuery) -> Self {
        Self::Delayed(delay, Box::new(inner))
    }
}

/// Mock backend that returns pre-programmed responses in sequence.
/// Submission and query scripts advance independently.
pub struct MockBackend {
    submits: Vec<MockSubmit>,
    queries: Vec<MockQuery>,
    submit_count: AtomicUsize,
    query_count: AtomicUsize,
    submitted_texts: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new(submits: Vec<MockSubmit>, queries: Vec<MockQuery>) -> Self {
        Self {
            submits,
            queries,
            submit_count: AtomicUsize::new(0),
            query_count: AtomicUsize::new(0),
            submitted_texts: Mutex::new(Vec::new()),
        }
    }

    pub fn submit_count(&self) -> usize {
        self.submit_count.load(Ordering::Relaxed)
    }

    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::Relaxed)
    }

    /// The user texts passed to `submit`, in call order.
    pub fn submitted_texts(&self) -> Vec<String> {
        self.submitted_texts.lock().clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(
        &self,
        user_text: &str,
        _context: &ConversationContext,
    ) -> Result<SubmitOutcome, BackendError> {
        let idx = self.submit_count.fetch_add(1, Ordering::Relaxed);
        self.submitted_texts.lock().push(user_text.to_string());

        let Some(response) = self.submits.get(idx).cloned() else {
            return Err(BackendError::InvalidRequest(format!(
                "MockBackend: no submit response configured for call {idx}"
            )));
        };

        let mut current = response;
        loop {
            match current {
                MockSubmit::Immediate(payload) => return Ok(SubmitOutcome::Immediate(payload)),
                MockSubmit::Deferred(task_id) => return Ok(SubmitOutcome::Deferred { task_id }),
                MockSubmit::Error(e) => return Err(e),
                MockSubmit::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    current = *inner;
                }
            }
        }
    }

    async fn query_task(&self, _task_id: &TaskId) -> Result<TaskState, BackendError> {
        let idx = self.query_count.fetch_add(1, Ordering::Relaxed);

        let Some(response) = self.queries.get(idx).cloned() else {
            return Err(BackendError::InvalidRequest(format!(
                "MockBackend: no query response configured for call {idx}"
            )));
        };

        let mut current = response;
        loop {
            match current {
                MockQuery::Processing => return Ok(TaskState::Processing),
                MockQuery::Completed(payload) => return Ok(TaskState::Completed(payload)),
                MockQuery::Errored(message) => return Ok(TaskState::Errored { message }),
                MockQuery::Error(e) => return Err(e),
                MockQuery::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    current = *inner;
                }
            }
        }
    }
}
