//! Pointer events and the hit-testing pointer queue
//!
//! Pointer events arrive from the platform in window coordinates. The
//! [`PointerQueue`] resolves which handlers a pointer hits using the area tree
//! built from the last frame's operation stream, and delivers each handler a
//! copy of the event in its own coordinate space.
//!
//! ```text
//!   platform ──► Router::queue ──► PointerQueue::push
//!                                      │ hit tree walk (top-most first)
//!                                      ▼
//!                         HandlerEvents[key] += PointerEvent
//! ```

mod queue;

pub use queue::PointerQueue;
pub(crate) use queue::Scope;

use std::time::Duration;

use bitflags::bitflags;
use glam::Vec2;

use crate::keyboard::Modifiers;

bitflags! {
    /// Kind of a pointer event. Handlers declare a mask of the kinds they
    /// want to receive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PointerKind: u8 {
        /// The handler was dropped, or the gesture was aborted by the system.
        const CANCEL  = 0b0000_0001;
        const PRESS   = 0b0000_0010;
        const RELEASE = 0b0000_0100;
        const MOVE    = 0b0000_1000;
        const ENTER   = 0b0001_0000;
        const LEAVE   = 0b0010_0000;
        const SCROLL  = 0b0100_0000;
    }
}

impl Default for PointerKind {
    fn default() -> Self {
        Self::MOVE
    }
}

bitflags! {
    /// Pressed pointer buttons.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Buttons: u8 {
        const PRIMARY   = 0b001;
        const SECONDARY = 0b010;
        const TERTIARY  = 0b100;
    }
}

/// Device that produced a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Source {
    #[default]
    Mouse,
    Touch,
}

/// Priority of a delivered pointer event relative to the other handlers
/// receiving the same event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum Priority {
    /// Shared with other handlers.
    #[default]
    Shared,
    /// The handler is the top-most one under the pointer.
    Foremost,
    /// The handler is the only one receiving events for a pressed pointer.
    Grabbed,
}

/// Identifies a pointer (a mouse, one finger of a touch screen) across a
/// gesture.
pub type PointerId = u32;

/// A pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub source: Source,
    pub pointer_id: PointerId,
    /// Set by the queue when delivering.
    pub priority: Priority,
    /// Timestamp supplied by the platform, relative to an arbitrary epoch.
    pub time: Duration,
    pub buttons: Buttons,
    /// Position in the receiving handler's coordinate space.
    pub position: Vec2,
    pub scroll: Vec2,
    pub modifiers: Modifiers,
    /// Whether the position lies inside the receiving handler's area. Only
    /// false for events delivered to a handler holding a pressed pointer.
    pub hit: bool,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, position: Vec2) -> Self {
        Self {
            kind,
            position,
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    pub fn with_pointer_id(mut self, id: PointerId) -> Self {
        self.pointer_id = id;
        self
    }

    pub fn with_buttons(mut self, buttons: Buttons) -> Self {
        self.buttons = buttons;
        self
    }

    pub fn with_scroll(mut self, scroll: Vec2) -> Self {
        self.scroll = scroll;
        self
    }
}

/// Mouse cursor shapes a handler area can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Cursor {
    #[default]
    Default = 0,
    None,
    Text,
    VerticalText,
    Pointer,
    Crosshair,
    AllScroll,
    ColResize,
    RowResize,
    Grab,
    Grabbing,
    NotAllowed,
    Wait,
    Progress,
    NorthWestResize,
    NorthEastResize,
    SouthWestResize,
    SouthEastResize,
    NorthSouthResize,
    EastWestResize,
    WestResize,
    EastResize,
    NorthResize,
    SouthResize,
}

impl Cursor {
    const ALL: [Cursor; 24] = [
        Cursor::Default,
        Cursor::None,
        Cursor::Text,
        Cursor::VerticalText,
        Cursor::Pointer,
        Cursor::Crosshair,
        Cursor::AllScroll,
        Cursor::ColResize,
        Cursor::RowResize,
        Cursor::Grab,
        Cursor::Grabbing,
        Cursor::NotAllowed,
        Cursor::Wait,
        Cursor::Progress,
        Cursor::NorthWestResize,
        Cursor::NorthEastResize,
        Cursor::SouthWestResize,
        Cursor::SouthEastResize,
        Cursor::NorthSouthResize,
        Cursor::EastWestResize,
        Cursor::WestResize,
        Cursor::EastResize,
        Cursor::NorthResize,
        Cursor::SouthResize,
    ];

    pub fn from_u8(v: u8) -> Option<Self> {
        Self::ALL.get(v as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_wire_values() {
        for c in Cursor::ALL {
            assert_eq!(Cursor::from_u8(c as u8), Some(c));
        }
        assert_eq!(Cursor::from_u8(200), None);
    }
}
