//! Handler identities and per-handler event queues

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::event::Event;

static NEXT_HANDLER_KEY: AtomicU64 = AtomicU64::new(1);

/// Opaque, stable identity under which client code registers interest in
/// pointer, key, clipboard or profiling events.
///
/// Keys are plain values: they travel through the operation stream as a
/// 64-bit integer and compare by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerKey(NonZeroU64);

impl HandlerKey {
    /// Allocate a fresh process-unique key.
    pub fn new() -> Self {
        let raw = NEXT_HANDLER_KEY.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and would need 2^64 allocations to wrap.
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    /// Rebuild a key from its wire representation. Zero encodes "no key".
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

impl Default for HandlerKey {
    fn default() -> Self {
        Self::new()
    }
}

/// Events queued for handlers between two frames.
///
/// The Router accumulates events here; the window moves the whole set into
/// the next `FrameEvent` so the client observes one frame's deliveries at
/// once.
#[derive(Debug, Default, Clone)]
pub struct HandlerEvents {
    handlers: HashMap<HandlerKey, Vec<Event>>,
    had_events: bool,
}

impl HandlerEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event and mark the set as redraw-worthy.
    pub(crate) fn add(&mut self, key: HandlerKey, event: impl Into<Event>) {
        self.handlers.entry(key).or_default().push(event.into());
        self.had_events = true;
    }

    /// Queue an event without asking for a redraw.
    pub(crate) fn add_no_redraw(&mut self, key: HandlerKey, event: impl Into<Event>) {
        self.handlers.entry(key).or_default().push(event.into());
    }

    /// Replace the pending events of a handler without asking for a redraw.
    pub(crate) fn set(&mut self, key: HandlerKey, events: Vec<Event>) {
        self.handlers.insert(key, events);
    }

    /// Report whether any redraw-worthy event was added since the last call.
    pub(crate) fn had_events(&mut self) -> bool {
        std::mem::take(&mut self.had_events)
    }

    /// Drain the events queued for `key`, oldest first.
    pub fn take(&mut self, key: HandlerKey) -> Vec<Event> {
        self.handlers.remove(&key).unwrap_or_default()
    }

    /// Borrow the events queued for `key` without draining them.
    pub fn peek(&self, key: HandlerKey) -> &[Event] {
        self.handlers.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Handlers with at least one pending event.
    pub fn keys(&self) -> impl Iterator<Item = HandlerKey> + '_ {
        self.handlers
            .iter()
            .filter(|(_, evts)| !evts.is_empty())
            .map(|(k, _)| *k)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.values().all(Vec::is_empty)
    }

    pub(crate) fn clear(&mut self) {
        self.handlers.clear();
        self.had_events = false;
    }

    /// Move every pending event out, leaving this set empty.
    pub(crate) fn drain(&mut self) -> HandlerEvents {
        HandlerEvents {
            handlers: std::mem::take(&mut self.handlers),
            had_events: std::mem::take(&mut self.had_events),
        }
    }
}
