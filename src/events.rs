//! The event manager (spec.md §4.3): buffers and orders outgoing BiDi
//! events per browsing context and per channel, and implements the
//! "promise event" mechanism (spec.md §9's "Deferred values") so an
//! event's emission *position* is fixed when it is registered, not when
//! whatever CDP event resolves it finally arrives — the device that keeps
//! `beforeRequestSent`/`responseStarted`/`responseCompleted` ordered even
//! though their constituent CDP events race each other.

use std::collections::VecDeque;

use fnv::FnvHashMap;

use crate::registry::BrowsingContextId;

/// A fully-formed outgoing BiDi event, ready to be wrapped into one wire
/// message per channel it must be delivered on.
#[derive(Debug, Clone)]
pub struct EventPayload {
    pub method: String,
    pub params: serde_json::Value,
    pub context: Option<BrowsingContextId>,
    pub channels: Vec<String>,
}

#[derive(Debug)]
enum Slot {
    Ready(EventPayload),
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PromiseToken(u64);

/// Which queue a promise token's slot lives in, so `resolve` can find it
/// without scanning every queue.
#[derive(Debug, Clone)]
enum QueueKey {
    Global,
    Context(BrowsingContextId),
}

#[derive(Default)]
pub struct EventManager {
    per_context: FnvHashMap<BrowsingContextId, VecDeque<(u64, Slot)>>,
    global: VecDeque<(u64, Slot)>,
    token_queue: FnvHashMap<u64, QueueKey>,
    next_token: u64,
}

impl EventManager {
    fn alloc_token(&mut self) -> u64 {
        let t = self.next_token;
        self.next_token += 1;
        t
    }

    fn queue_mut(&mut self, context: &Option<BrowsingContextId>) -> &mut VecDeque<(u64, Slot)> {
        match context {
            Some(ctx) => self.per_context.entry(ctx.clone()).or_default(),
            None => &mut self.global,
        }
    }

    /// Enqueues an event whose content is already fully known.
    pub fn enqueue_ready(&mut self, payload: EventPayload) {
        let context = payload.context.clone();
        self.queue_mut(&context).push_back((0, Slot::Ready(payload)));
    }

    /// Reserves this event's position in its queue before its content is
    /// known. The returned token must later be passed to [`Self::resolve`].
    pub fn register_promise(&mut self, context: Option<BrowsingContextId>) -> PromiseToken {
        let token = self.alloc_token();
        let key = match &context {
            Some(ctx) => QueueKey::Context(ctx.clone()),
            None => QueueKey::Global,
        };
        self.queue_mut(&context).push_back((token, Slot::Pending));
        self.token_queue.insert(token, key);
        PromiseToken(token)
    }

    /// Fills in a previously reserved slot. `None` drops the slot silently
    /// (spec.md §4.3: "A failed promise event drops the slot silently").
    pub fn resolve(&mut self, token: PromiseToken, payload: Option<EventPayload>) {
        let Some(key) = self.token_queue.remove(&token.0) else {
            return;
        };
        let queue = match key {
            QueueKey::Global => &mut self.global,
            QueueKey::Context(ctx) => self.per_context.entry(ctx).or_default(),
        };
        if let Some(slot) = queue.iter_mut().find(|(id, _)| *id == token.0) {
            match payload {
                Some(p) => slot.1 = Slot::Ready(p),
                None => {
                    let pos = queue.iter().position(|(id, _)| *id == token.0);
                    if let Some(pos) = pos {
                        queue.remove(pos);
                    }
                }
            }
        }
    }

    /// Pops every event ready to send, in per-queue FIFO order, stopping a
    /// queue at its first still-pending slot. Cross-queue (cross-context)
    /// order is unspecified, matching spec.md §5.
    pub fn drain_ready(&mut self) -> Vec<EventPayload> {
        let mut out = Vec::new();
        Self::drain_queue(&mut self.global, &mut out);
        for queue in self.per_context.values_mut() {
            Self::drain_queue(queue, &mut out);
        }
        out
    }

    fn drain_queue(queue: &mut VecDeque<(u64, Slot)>, out: &mut Vec<EventPayload>) {
        while let Some((_, slot)) = queue.front() {
            if matches!(slot, Slot::Pending) {
                break;
            }
            let (_, slot) = queue.pop_front().unwrap();
            if let Slot::Ready(payload) = slot {
                out.push(payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(method: &str) -> EventPayload {
        EventPayload {
            method: method.into(),
            params: serde_json::json!({}),
            context: None,
            channels: vec!["c".into()],
        }
    }

    #[test]
    fn promise_event_keeps_its_registration_position() {
        let mut mgr = EventManager::default();
        let token = mgr.register_promise(None);
        mgr.enqueue_ready(payload("network.responseStarted"));
        mgr.resolve(token, Some(payload("network.beforeRequestSent")));

        let drained = mgr.drain_ready();
        assert_eq!(drained[0].method, "network.beforeRequestSent");
        assert_eq!(drained[1].method, "network.responseStarted");
    }

    #[test]
    fn unresolved_promise_blocks_the_rest_of_its_queue() {
        let mut mgr = EventManager::default();
        let _token = mgr.register_promise(None);
        mgr.enqueue_ready(payload("network.responseStarted"));
        assert!(mgr.drain_ready().is_empty());
    }

    #[test]
    fn dropped_promise_is_silently_skipped() {
        let mut mgr = EventManager::default();
        let token = mgr.register_promise(None);
        mgr.enqueue_ready(payload("network.responseStarted"));
        mgr.resolve(token, None);
        let drained = mgr.drain_ready();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].method, "network.responseStarted");
    }
}
