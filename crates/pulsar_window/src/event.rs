//! Events delivered to the client of a window.

use std::sync::Arc;
use std::time::SystemTime;

use crossbeam_channel::{Receiver, Sender};
use glam::IVec2;
use parking_lot::Mutex;
use pulsar_input::{HandlerEvents, Ops};

use crate::config::{Config, Metric};
use crate::error::WindowError;

#[derive(Debug)]
pub enum WindowEvent {
    Frame(FrameEvent),
    Config(ConfigEvent),
    View(ViewEvent),
    Stage(StageEvent),
    Command(CommandEvent),
    /// Terminal. No events follow it.
    Destroy(DestroyEvent),
}

/// The window configuration changed.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigEvent {
    pub config: Config,
}

/// The native view backing the window was created or destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewEvent {
    /// Opaque platform handle, `None` while there is no view.
    pub handle: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Stage {
    /// Not visible. No frames are produced.
    #[default]
    Paused,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageEvent {
    pub stage: Stage,
}

/// System commands that are not input for a specific handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandEvent {
    /// Platform back button or gesture.
    Back,
}

#[derive(Debug)]
pub struct DestroyEvent {
    /// Why the window died, if it did not close normally.
    pub error: Option<WindowError>,
}

/// Space taken by system bars or decorations around the content, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Insets {
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
}

/// Request for a new frame.
///
/// Answer with [`FrameEvent::frame`]. A frame event dropped without an
/// answer, or left behind by the next call to `Window::next_event`, counts
/// as a skipped frame.
#[derive(Debug)]
pub struct FrameEvent {
    pub now: SystemTime,
    pub metric: Metric,
    /// Content size, excluding synthesized decorations.
    pub size: IVec2,
    pub insets: Insets,
    /// Input routed to handlers since the previous frame.
    pub source: HandlerEvents,
    /// Frame number, starting at 1.
    pub seq: u64,
    pub(crate) reply: FrameReply,
}

impl FrameEvent {
    /// Submit the operations for this frame. Blocks until the window no
    /// longer needs them and hands the buffer back for reuse.
    pub fn frame(self, ops: Ops) -> Ops {
        profiling::profile_scope!("Window::submit_frame");
        let Some(sender) = self.reply.slot.lock().take() else {
            return ops;
        };
        if let Err(err) = sender.send(ops) {
            return err.into_inner();
        }
        drop(sender);
        self.reply.ack.recv().unwrap_or_default()
    }
}

/// Answer channel of one frame.
///
/// The sender sits in a slot shared with the client handle, so both
/// dropping the event and polling for the next one close the channel.
#[derive(Debug)]
pub(crate) struct FrameReply {
    pub(crate) slot: FrameSlot,
    pub(crate) ack: Receiver<Ops>,
}

pub(crate) type FrameSlot = Arc<Mutex<Option<Sender<Ops>>>>;

impl FrameReply {
    /// Returns the reply half and the native half: the operations receiver
    /// and the ack sender.
    pub(crate) fn new() -> (Self, Receiver<Ops>, Sender<Ops>) {
        let (ops_tx, ops_rx) = crossbeam_channel::bounded(1);
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        let reply = Self {
            slot: Arc::new(Mutex::new(Some(ops_tx))),
            ack: ack_rx,
        };
        (reply, ops_rx, ack_tx)
    }
}

impl Drop for FrameReply {
    fn drop(&mut self) {
        self.slot.lock().take();
    }
}
