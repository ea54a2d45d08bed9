use serde::{Deserialize, Serialize};

/// A snapshot of recent resolved turns, sent with each submission so the
/// backend can answer in context. The backend treats it as read-only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationContext {
    pub turns: Vec<ContextTurn>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContextTurn {
    pub user_text: String,
    pub reply_text: String,
}

impl ConversationContext {
    /// An empty context (useful for testing and first turns).
    pub fn empty() -> Self {
        Self { turns: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
