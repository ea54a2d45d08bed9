//! The exchange store: the owned, ordered record of conversation turns.
//!
//! All mutations go through a single update-by-id entry point; subscribers
//! observe mutations as `ChatEvent`s rather than sharing the collection.
//! `close()` marks the hosting view as torn down: late poll continuations
//! check it and drop their results instead of mutating a dead store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tokio::sync::broadcast;

use solace_core::analysis::Analysis;
use solace_core::context::{ContextTurn, ConversationContext};
use solace_core::events::ChatEvent;
use solace_core::exchange::{Exchange, ExchangeState};
use solace_core::ids::ExchangeId;

use crate::error::StoreError;

struct Inner {
    exchanges: Vec<Exchange>,
    index: HashMap<ExchangeId, usize>,
}

pub struct ExchangeStore {
    inner: RwLock<Inner>,
    event_tx: broadcast::Sender<ChatEvent>,
    closed: AtomicBool,
}

impl ExchangeStore {
    pub fn new(event_tx: broadcast::Sender<ChatEvent>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                exchanges: Vec::new(),
                index: HashMap::new(),
            }),
            event_tx,
            closed: AtomicBool::new(false),
        }
    }

    /// Create a new pending exchange and append it to the conversation.
    pub fn append(&self, user_text: &str) -> Result<ExchangeId, StoreError> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }

        let exchange = Exchange::new(user_text);
        let id = exchange.id.clone();

        let mut inner = self.inner.write();
        let idx = inner.exchanges.len();
        inner.index.insert(id.clone(), idx);
        inner.exchanges.push(exchange);
        drop(inner);

        let _ = self.event_tx.send(ChatEvent::ExchangeCreated {
            exchange_id: id.clone(),
            user_text: user_text.to_string(),
        });

        Ok(id)
    }

    /// Transition an exchange to `Resolved`. Rejects unknown ids and
    /// exchanges that already reached a terminal state.
    pub fn resolve(
        &self,
        id: &ExchangeId,
        reply_text: String,
        analysis: Analysis,
    ) -> Result<(), StoreError> {
        let reply = reply_text.clone();
        self.transition(id, ExchangeState::Resolved { reply_text, analysis })?;

        let _ = self.event_tx.send(ChatEvent::ExchangeResolved {
            exchange_id: id.clone(),
            reply_text: reply,
        });
        Ok(())
    }

    /// Transition an exchange to `Failed`.
    pub fn fail(&self, id: &ExchangeId, message: String) -> Result<(), StoreError> {
        let msg = message.clone();
        self.transition(id, ExchangeState::Failed { message })?;

        let _ = self.event_tx.send(ChatEvent::ExchangeFailed {
            exchange_id: id.clone(),
            message: msg,
        });
        Ok(())
    }

    /// The single mutation entry point. Enforces the per-id monotonic
    /// lifecycle: out of `Pending` exactly once, never backward.
    fn transition(&self, id: &ExchangeId, to: ExchangeState) -> Result<(), StoreError> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }

        let mut inner = self.inner.write();
        let idx = *inner
            .index
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let exchange = &mut inner.exchanges[idx];

        if exchange.is_terminal() {
            return Err(StoreError::Terminal(id.to_string()));
        }

        exchange.state = to;
        Ok(())
    }

    pub fn get(&self, id: &ExchangeId) -> Option<Exchange> {
        let inner = self.inner.read();
        inner.index.get(id).map(|&idx| inner.exchanges[idx].clone())
    }

    /// Snapshot of the full conversation in submission order.
    pub fn list(&self) -> Vec<Exchange> {
        self.inner.read().exchanges.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().exchanges.is_empty()
    }

    /// The most recent resolved turns, oldest first, for the submission call.
    pub fn context(&self, max_turns: usize) -> ConversationContext {
        let inner = self.inner.read();
        let mut turns: Vec<ContextTurn> = inner
            .exchanges
            .iter()
            .rev()
            .filter_map(|ex| {
                ex.reply_text().map(|reply| ContextTurn {
                    user_text: ex.user_text.clone(),
                    reply_text: reply.to_string(),
                })
            })
            .take(max_turns)
            .collect();
        turns.reverse();
        ConversationContext { turns }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.event_tx.subscribe()
    }

    /// Mark the hosting view as torn down. All further mutations are
    /// rejected; reads stay available for teardown diagnostics.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}
