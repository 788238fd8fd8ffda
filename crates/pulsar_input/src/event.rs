//! The closed set of events routed to handlers.

use crate::keyboard::{EditEvent, FocusEvent, KeyEvent, SelectionEvent, SnippetEvent};
use crate::pointer::PointerEvent;

/// Clipboard content delivered to handlers that asked to read it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ClipboardEvent {
    pub mime: String,
    pub data: Vec<u8>,
}

impl ClipboardEvent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            mime: "text/plain".into(),
            data: text.into().into_bytes(),
        }
    }
}

/// Frame timing summary delivered to profile subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ProfileEvent {
    pub timings: String,
}

/// An event routed by the Router.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Pointer(PointerEvent),
    Key(KeyEvent),
    Edit(EditEvent),
    Focus(FocusEvent),
    Selection(SelectionEvent),
    Snippet(SnippetEvent),
    Clipboard(ClipboardEvent),
    Profile(ProfileEvent),
}

impl Event {
    pub fn as_pointer(&self) -> Option<&PointerEvent> {
        match self {
            Event::Pointer(e) => Some(e),
            _ => None,
        }
    }
}

macro_rules! impl_from_event {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Event {
                fn from(e: $ty) -> Self {
                    Event::$variant(e)
                }
            }
        )*
    };
}

impl_from_event!(
    Pointer(PointerEvent),
    Key(KeyEvent),
    Edit(EditEvent),
    Focus(FocusEvent),
    Selection(SelectionEvent),
    Snippet(SnippetEvent),
    Clipboard(ClipboardEvent),
    Profile(ProfileEvent),
);
