//! Independent follow-up workflows triggered by completed results.
//!
//! Each workflow type owns one slot: activating again replaces the open
//! suggestion (last-write-wins) instead of stacking a second prompt.
//! Confirming or dismissing one workflow never touches the others or the
//! exchange that produced it.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use solace_core::analysis::{
    ActionPlanSuggestion, CrisisAssessment, ScheduleSuggestion, WorkflowKind,
};
use solace_core::events::ChatEvent;
use solace_core::ids::ExchangeId;

/// The sub-record a workflow was activated with. Read-only snapshot,
/// forwarded from the analysis payload untouched.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowData {
    Crisis(CrisisAssessment),
    ActionPlan(ActionPlanSuggestion),
    Schedule(ScheduleSuggestion),
}

impl WorkflowData {
    pub fn kind(&self) -> WorkflowKind {
        match self {
            Self::Crisis(_) => WorkflowKind::Crisis,
            Self::ActionPlan(_) => WorkflowKind::ActionPlan,
            Self::Schedule(_) => WorkflowKind::Schedule,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Suggested,
    Confirmed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowState {
    pub kind: WorkflowKind,
    /// The exchange whose result triggered this workflow.
    pub exchange_id: ExchangeId,
    pub data: WorkflowData,
    pub phase: WorkflowPhase,
}

/// At most one open workflow per kind.
pub struct WorkflowHub {
    slots: DashMap<WorkflowKind, WorkflowState>,
    event_tx: broadcast::Sender<ChatEvent>,
}

impl WorkflowHub {
    pub fn new(event_tx: broadcast::Sender<ChatEvent>) -> Self {
        Self {
            slots: DashMap::new(),
            event_tx,
        }
    }

    /// Open (or replace) the workflow for this data's kind.
    pub fn activate(&self, exchange_id: ExchangeId, data: WorkflowData) {
        let kind = data.kind();
        self.slots.insert(
            kind,
            WorkflowState {
                kind,
                exchange_id: exchange_id.clone(),
                data,
                phase: WorkflowPhase::Suggested,
            },
        );
        let _ = self
            .event_tx
            .send(ChatEvent::WorkflowActivated { exchange_id, kind });
    }

    /// Read accessor for the UI. `None` when no workflow of this kind is open.
    pub fn active(&self, kind: WorkflowKind) -> Option<WorkflowState> {
        self.slots.get(&kind).map(|s| s.value().clone())
    }

    /// Mark the open workflow accepted and return its snapshot for the
    /// follow-up call. `None` when nothing is open.
    pub fn confirm(&self, kind: WorkflowKind) -> Option<WorkflowState> {
        let snapshot = {
            let mut entry = self.slots.get_mut(&kind)?;
            entry.phase = WorkflowPhase::Confirmed;
            entry.value().clone()
        };
        let _ = self.event_tx.send(ChatEvent::WorkflowConfirmed { kind });
        Some(snapshot)
    }

    /// Clear the open workflow. Returns false when nothing was open.
    pub fn dismiss(&self, kind: WorkflowKind) -> bool {
        if self.slots.remove(&kind).is_some() {
            let _ = self.event_tx.send(ChatEvent::WorkflowDismissed { kind });
            true
        } else {
            false
        }
    }

    pub fn active_count(&self) -> usize {
        self.slots.len()
    }
}
