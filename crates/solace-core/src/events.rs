use serde::{Deserialize, Serialize};

use crate::analysis::WorkflowKind;
use crate::ids::{ExchangeId, TaskId};

/// Events published on the client's broadcast channel so the surrounding
/// UI can re-render. These are notifications, not commands; consumers
/// read fresh state from the store/hub after each one.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChatEvent {
    #[serde(rename = "exchange_created")]
    ExchangeCreated {
        exchange_id: ExchangeId,
        user_text: String,
    },

    #[serde(rename = "exchange_resolved")]
    ExchangeResolved {
        exchange_id: ExchangeId,
        reply_text: String,
    },

    #[serde(rename = "exchange_failed")]
    ExchangeFailed {
        exchange_id: ExchangeId,
        message: String,
    },

    /// Polling gave up while the backend was still working. The exchange
    /// stays pending; a UI may surface a "taking longer than expected"
    /// affordance on this.
    #[serde(rename = "poll_abandoned")]
    PollAbandoned {
        exchange_id: ExchangeId,
        task_id: TaskId,
        attempts: u32,
    },

    #[serde(rename = "workflow_activated")]
    WorkflowActivated {
        exchange_id: ExchangeId,
        kind: WorkflowKind,
    },

    #[serde(rename = "workflow_confirmed")]
    WorkflowConfirmed { kind: WorkflowKind },

    #[serde(rename = "workflow_dismissed")]
    WorkflowDismissed { kind: WorkflowKind },
}

impl ChatEvent {
    pub fn exchange_id(&self) -> Option<&ExchangeId> {
        match self {
            Self::ExchangeCreated { exchange_id, .. }
            | Self::ExchangeResolved { exchange_id, .. }
            | Self::ExchangeFailed { exchange_id, .. }
            | Self::PollAbandoned { exchange_id, .. }
            | Self::WorkflowActivated { exchange_id, .. } => Some(exchange_id),
            Self::WorkflowConfirmed { .. } | Self::WorkflowDismissed { .. } => None,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ExchangeCreated { .. } => "exchange_created",
            Self::ExchangeResolved { .. } => "exchange_resolved",
            Self::ExchangeFailed { .. } => "exchange_failed",
            Self::PollAbandoned { .. } => "poll_abandoned",
            Self::WorkflowActivated { .. } => "workflow_activated",
            Self::WorkflowConfirmed { .. } => "workflow_confirmed",
            Self::WorkflowDismissed { .. } => "workflow_dismissed",
        }
    }
}
