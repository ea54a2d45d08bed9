use async_trait::async_trait;

use crate::analysis::AnalysisPayload;
use crate::context::ConversationContext;
use crate::errors::BackendError;
use crate::ids::TaskId;

/// Result of a submission call. The backend decides whether to answer
/// inline or defer to a background computation.
#[derive(Clone, Debug)]
pub enum SubmitOutcome {
    Immediate(AnalysisPayload),
    Deferred { task_id: TaskId },
}

/// Result of querying a background task.
#[derive(Clone, Debug)]
pub enum TaskState {
    Processing,
    Completed(AnalysisPayload),
    Errored { message: String },
}

impl TaskState {
    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed(_) => "completed",
            Self::Errored { .. } => "errored",
        }
    }
}

/// The backend collaborator consumed by the orchestration core.
/// An unknown task handle surfaces as `BackendError::TaskNotFound`, a
/// distinct failure mode from a transient network error.
#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    async fn submit(
        &self,
        user_text: &str,
        context: &ConversationContext,
    ) -> Result<SubmitOutcome, BackendError>;

    async fn query_task(&self, task_id: &TaskId) -> Result<TaskState, BackendError>;
}
