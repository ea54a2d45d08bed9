pub mod dispatcher;
pub mod error;
pub mod orchestrator;
pub mod poller;
pub mod workflows;

pub use dispatcher::{ResultDispatcher, TerminalResult, FAILURE_MESSAGE};
pub use error::EngineError;
pub use orchestrator::{ChatOrchestrator, OrchestratorConfig};
pub use poller::{BackgroundTask, PollError, PollOutcome, PollerConfig, TaskPoller};
pub use workflows::{WorkflowData, WorkflowHub, WorkflowPhase, WorkflowState};
