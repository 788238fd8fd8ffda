//! Clipboard read requests and pending writes.

use crate::event::ClipboardEvent;
use crate::handler::{HandlerEvents, HandlerKey};

#[derive(Debug, Default)]
pub struct ClipboardQueue {
    /// Handlers waiting for the next clipboard content.
    receivers: Vec<HandlerKey>,
    /// A new receiver registered since the last `clipboard_requested`.
    requested: bool,
    write: Option<ClipboardEvent>,
}

impl ClipboardQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn read_op(&mut self, key: HandlerKey) {
        if !self.receivers.contains(&key) {
            self.receivers.push(key);
            self.requested = true;
        }
    }

    pub(crate) fn write_op(&mut self, mime: &str, data: &[u8]) {
        self.write = Some(ClipboardEvent {
            mime: mime.to_owned(),
            data: data.to_vec(),
        });
    }

    /// Most recent content written by the client, if not yet forwarded.
    pub fn take_write(&mut self) -> Option<ClipboardEvent> {
        self.write.take()
    }

    /// Whether a handler started waiting for the clipboard since the last
    /// call.
    pub fn requested(&mut self) -> bool {
        let req = self.requested && !self.receivers.is_empty();
        self.requested = false;
        req
    }

    /// Deliver clipboard content to every waiting handler. Returns whether
    /// any handler received it.
    pub fn push(&mut self, e: ClipboardEvent, events: &mut HandlerEvents) -> bool {
        let receivers = std::mem::take(&mut self.receivers);
        for k in &receivers {
            events.add(*k, e.clone());
        }
        !receivers.is_empty()
    }
}
