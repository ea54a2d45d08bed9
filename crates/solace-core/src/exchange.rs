use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::Analysis;
use crate::ids::ExchangeId;

/// One user turn and its (eventual) reply, tracked as a single lifecycle
/// unit. The reply text and analysis live inside the `Resolved` variant,
/// so they exist exactly when the exchange is resolved.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Exchange {
    pub id: ExchangeId,
    pub user_text: String,
    pub state: ExchangeState,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle: `Pending → Resolved` or `Pending → Failed`. Terminal states
/// are immutable; no other transitions exist.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExchangeState {
    Pending,
    Resolved { reply_text: String, analysis: Analysis },
    Failed { message: String },
}

impl Exchange {
    pub fn new(user_text: impl Into<String>) -> Self {
        Self {
            id: ExchangeId::new(),
            user_text: user_text.into(),
            state: ExchangeState::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, ExchangeState::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    pub fn reply_text(&self) -> Option<&str> {
        match &self.state {
            ExchangeState::Resolved { reply_text, .. } => Some(reply_text),
            _ => None,
        }
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        match &self.state {
            ExchangeState::Resolved { analysis, .. } => Some(analysis),
            _ => None,
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        match &self.state {
            ExchangeState::Failed { message } => Some(message),
            _ => None,
        }
    }

    pub fn state_name(&self) -> &'static str {
        match self.state {
            ExchangeState::Pending => "pending",
            ExchangeState::Resolved { .. } => "resolved",
            ExchangeState::Failed { .. } => "failed",
        }
    }
}
