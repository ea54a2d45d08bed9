//! Routes a terminal result into the exchange store and fans completed
//! payloads out to the follow-up workflows.
//!
//! Every failure, whatever stage produced it, funnels through
//! `TerminalResult::Failed` here: one place converts errors into a
//! user-visible message, so the failure UX is identical across stages.

use std::sync::Arc;

use tracing::{debug, warn};

use solace_core::analysis::AnalysisPayload;
use solace_core::ids::ExchangeId;
use solace_store::ExchangeStore;

use crate::workflows::{WorkflowData, WorkflowHub};

/// The one user-facing failure message.
pub const FAILURE_MESSAGE: &str =
    "Something went wrong while preparing a reply. Please try again.";

/// A terminal result for an exchange, from any stage.
#[derive(Clone, Debug)]
pub enum TerminalResult {
    Completed(AnalysisPayload),
    /// `message` is the internal reason; the stored exchange always gets
    /// the generic user-facing text.
    Failed { message: String },
}

pub struct ResultDispatcher {
    store: Arc<ExchangeStore>,
    workflows: Arc<WorkflowHub>,
}

impl ResultDispatcher {
    pub fn new(store: Arc<ExchangeStore>, workflows: Arc<WorkflowHub>) -> Self {
        Self { store, workflows }
    }

    pub fn dispatch(&self, exchange_id: &ExchangeId, result: TerminalResult) {
        // The hosting view may have been torn down while a poll was in
        // flight; a late continuation must not mutate a dead store.
        if self.store.is_closed() {
            debug!(exchange_id = %exchange_id, "store closed; dropping late result");
            return;
        }

        match result {
            TerminalResult::Failed { message } => {
                warn!(exchange_id = %exchange_id, reason = %message, "exchange failed");
                if let Err(e) = self.store.fail(exchange_id, FAILURE_MESSAGE.to_string()) {
                    warn!(exchange_id = %exchange_id, error = %e, "could not record failure");
                }
            }
            TerminalResult::Completed(payload) => {
                let analysis = payload.snapshot();
                if let Err(e) =
                    self.store
                        .resolve(exchange_id, payload.reply_text.clone(), analysis)
                {
                    warn!(
                        exchange_id = %exchange_id,
                        error = %e,
                        "could not resolve exchange; skipping workflow activation"
                    );
                    return;
                }

                // Each sub-record is checked independently and
                // unconditionally; none blocks another.
                if let Some(crisis) = payload.crisis {
                    if crisis.level.is_high_severity() {
                        self.workflows
                            .activate(exchange_id.clone(), WorkflowData::Crisis(crisis));
                    }
                }
                if let Some(plan) = payload.action_plan {
                    if plan.should_suggest {
                        self.workflows
                            .activate(exchange_id.clone(), WorkflowData::ActionPlan(plan));
                    }
                }
                if let Some(schedule) = payload.schedule {
                    if schedule.should_suggest {
                        self.workflows
                            .activate(exchange_id.clone(), WorkflowData::Schedule(schedule));
                    }
                }
            }
        }
    }
}
