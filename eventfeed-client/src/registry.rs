//! Subscription bookkeeping for a single client.

use crate::events::{ClientEvent, EventName};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with each event delivered under a subscribed name.
///
/// Returning `Err` is logged and does not affect other handlers.
pub type Handler = Arc<dyn Fn(&ClientEvent) -> anyhow::Result<()> + Send + Sync>;

/// Identifies one registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Numeric value of the ID.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct Subscription {
    id: SubscriptionId,
    handler: Handler,
    once: bool,
}

/// Maps event names to their handlers, in registration order.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    next_id: u64,
    handlers: HashMap<EventName, Vec<Subscription>>,
}

impl SubscriptionRegistry {
    pub(crate) fn subscribe(
        &mut self,
        name: EventName,
        handler: Handler,
        once: bool,
    ) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.handlers
            .entry(name)
            .or_default()
            .push(Subscription { id, handler, once });
        id
    }

    /// Remove one handler, or every handler for `name` when `id` is `None`.
    pub(crate) fn unsubscribe(&mut self, name: &EventName, id: Option<SubscriptionId>) -> usize {
        let Some(subs) = self.handlers.get_mut(name) else {
            return 0;
        };
        let before = subs.len();
        match id {
            Some(id) => subs.retain(|s| s.id != id),
            None => subs.clear(),
        }
        let removed = before - subs.len();
        if subs.is_empty() {
            self.handlers.remove(name);
        }
        removed
    }

    /// Snapshot the handlers for `name`, dropping one-shot entries first.
    pub(crate) fn take_handlers(&mut self, name: &EventName) -> Vec<(SubscriptionId, Handler)> {
        let Some(subs) = self.handlers.get_mut(name) else {
            return Vec::new();
        };
        let snapshot = subs
            .iter()
            .map(|s| (s.id, Arc::clone(&s.handler)))
            .collect();
        subs.retain(|s| !s.once);
        if subs.is_empty() {
            self.handlers.remove(name);
        }
        snapshot
    }

    pub(crate) fn handler_count(&self, name: &EventName) -> usize {
        self.handlers.get(name).map_or(0, Vec::len)
    }

    pub(crate) fn clear(&mut self) {
        self.handlers.clear();
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .handlers
            .iter()
            .map(|(name, subs)| (name.as_str(), subs.len()))
            .collect();
        f.debug_struct("SubscriptionRegistry")
            .field("handlers", &counts)
            .finish()
    }
}
