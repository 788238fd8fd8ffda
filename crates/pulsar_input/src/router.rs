//! Unified input router
//!
//! The [`Router`] is the single object a window consults each frame. It
//! decodes the frame's operation stream once, hands pointer and key records
//! to their queues, and keeps the side-channel requests (redraw deadline,
//! clipboard, on-screen keyboard, profiling) the window acts on afterwards.
//!
//! ```text
//!   Ops ──► Router::frame ─┬─► PointerQueue (areas, hit tree, handlers)
//!                          ├─► KeyQueue     (focus, hints, editor state)
//!                          ├─► ClipboardQueue
//!                          └─► wakeup / profile subscribers
//!
//!   platform event ──► Router::queue ──► HandlerEvents ──► FrameEvent
//! ```
//!
//! The router never reads a clock: the same stream and the same events
//! always produce the same deliveries and deadline.

use std::time::{SystemTime, UNIX_EPOCH};

use glam::Vec2;

use crate::clipboard::ClipboardQueue;
use crate::event::{ClipboardEvent, Event, ProfileEvent};
use crate::handler::{HandlerEvents, HandlerKey};
use crate::keyboard::{
    EditorState, FocusDirection, InputHint, KeyEvent, KeyQueue, SnippetEvent, TextInputState,
};
use crate::ops::{Op, Ops, OpsReader};
use crate::pointer::{Cursor, PointerEvent, PointerKind, PointerQueue, Scope, Source};
use crate::semantic::{SemanticId, SemanticNode};
use crate::system::Action;

#[derive(Debug, Default)]
pub struct Router {
    pointer: PointerQueue,
    key: KeyQueue,
    clipboard: ClipboardQueue,
    handlers: HandlerEvents,
    profile_handlers: Vec<HandlerKey>,
    wakeup: Option<SystemTime>,
    stack: Vec<Scope>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the handler state with the declarations of a new frame.
    ///
    /// Events queued before this call are discarded; take them first with
    /// [`Router::take_events`].
    pub fn frame(&mut self, ops: &Ops) {
        profiling::profile_scope!("Router::frame");
        self.handlers.clear();
        self.wakeup = None;
        self.profile_handlers.clear();

        let mut scope = self.pointer.begin_frame();
        self.key.begin_frame();
        let mut stack = std::mem::take(&mut self.stack);
        stack.clear();
        for op in OpsReader::new(ops) {
            if scope.apply(&mut stack, &op) {
                continue;
            }
            match &op {
                Op::Invalidate(at) => {
                    self.wakeup = Some(match self.wakeup {
                        Some(current) if current <= *at => current,
                        _ => *at,
                    });
                }
                Op::Profile(key) => {
                    if !self.profile_handlers.contains(key) {
                        self.profile_handlers.push(*key);
                    }
                }
                Op::ClipboardRead(key) => self.clipboard.read_op(*key),
                Op::ClipboardWrite { mime, data } => self.clipboard.write_op(mime, data),
                Op::KeyInput(_)
                | Op::KeyFocus(_)
                | Op::SoftKeyboard(_)
                | Op::Selection(_)
                | Op::Snippet { .. } => {
                    let bounds = self.pointer.area_bounds(scope.area);
                    self.key.collect(&op, &scope, bounds);
                }
                _ => self.pointer.collect(&mut scope, &op, &mut self.handlers),
            }
        }
        self.stack = stack;

        self.pointer.end_frame(&mut self.handlers);
        self.key.end_frame(&mut self.handlers);
        if self.handlers.had_events() {
            self.wakeup = Some(UNIX_EPOCH);
        }
        tracing::trace!(wakeup = ?self.wakeup, "router frame");
    }

    /// Route an input event. Returns whether any handler received it.
    pub fn queue(&mut self, e: impl Into<Event>) -> bool {
        let delivered = match e.into() {
            Event::Pointer(e) => {
                self.pointer.push(e, &mut self.handlers);
                false
            }
            Event::Snippet(SnippetEvent(mut r)) => {
                // Grow the request to cover an overlapping snippet, so the
                // handler refreshes both at once.
                let current = self.key.editor_state().snippet.range;
                if current.overlaps(r) {
                    r.start = r.start.min(current.start);
                    r.end = r.end.max(current.end);
                }
                self.key.push(SnippetEvent(r), &mut self.handlers)
            }
            e @ (Event::Key(_) | Event::Edit(_) | Event::Focus(_) | Event::Selection(_)) => {
                self.key.push(e, &mut self.handlers)
            }
            Event::Clipboard(e) => self.clipboard.push(e, &mut self.handlers),
            Event::Profile(e) => self.queue_profile(e),
        };
        self.handlers.had_events() || delivered
    }

    fn queue_profile(&mut self, e: ProfileEvent) -> bool {
        for k in &self.profile_handlers {
            self.handlers.add(*k, e.clone());
        }
        !self.profile_handlers.is_empty()
    }

    /// Drain the events queued for one handler.
    pub fn events(&mut self, key: HandlerKey) -> Vec<Event> {
        self.handlers.take(key)
    }

    /// Drain every queued event, for delivery with the next frame.
    pub fn take_events(&mut self) -> HandlerEvents {
        self.handlers.drain()
    }

    /// Deadline of the next frame requested by the last operation stream.
    /// The Unix epoch means "as soon as possible".
    pub fn wakeup_time(&self) -> Option<SystemTime> {
        self.wakeup
    }

    /// Requested on-screen keyboard state, reset to `Keep` once read.
    pub fn text_input_state(&mut self) -> TextInputState {
        self.key.take_text_input_state()
    }

    pub fn text_input_hint(&mut self) -> (InputHint, bool) {
        self.key.input_hint()
    }

    /// Content the client asked to write to the clipboard, if any.
    pub fn write_clipboard(&mut self) -> Option<ClipboardEvent> {
        self.clipboard.take_write()
    }

    /// Whether a handler started waiting for clipboard content.
    pub fn clipboard_requested(&mut self) -> bool {
        self.clipboard.requested()
    }

    pub fn cursor(&self) -> Cursor {
        self.pointer.cursor()
    }

    pub fn editor_state(&self) -> EditorState {
        self.key.editor_state().clone()
    }

    /// Whether any handler subscribed to frame timings.
    pub fn profiling(&self) -> bool {
        !self.profile_handlers.is_empty()
    }

    pub fn focused(&self) -> Option<HandlerKey> {
        self.key.focus()
    }

    pub fn move_focus(&mut self, dir: FocusDirection) -> bool {
        self.key.move_focus(dir, &mut self.handlers)
    }

    /// Route a key press that would move focus. Only a focused handler that
    /// claimed the key receives it; otherwise returns false and the caller
    /// moves focus.
    pub fn queue_navigation(&mut self, e: KeyEvent) -> bool {
        self.key.push_navigation(e, &mut self.handlers)
    }

    pub fn action_at(&self, pos: Vec2) -> Option<Action> {
        self.pointer.action_at(pos)
    }

    pub fn semantic_at(&mut self, pos: Vec2) -> Option<SemanticId> {
        self.pointer.semantic_at(pos)
    }

    pub fn append_semantics(&mut self, nodes: &mut Vec<SemanticNode>) {
        self.pointer.append_semantics(nodes);
    }

    /// Simulate a tap at the centre of the focused handler's area, for
    /// platforms that activate the focused element from the keyboard.
    pub fn click_focus(&mut self) {
        let Some((bounds, area)) = self.key.focused_area() else {
            return;
        };
        let press = PointerEvent::new(PointerKind::PRESS, bounds.center()).with_source(Source::Touch);
        let release = PointerEvent {
            kind: PointerKind::RELEASE,
            ..press
        };
        self.pointer.deliver(area, press, &mut self.handlers);
        self.pointer.deliver(area, release, &mut self.handlers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Rect;
    use crate::keyboard::{FocusKeys, KeyName, Modifiers, TextRange};
    use crate::ops::{
        AreaOp, ClipboardReadOp, ClipboardWriteOp, InvalidateOp, KeyFocusOp, KeyInputOp,
        PointerInputOp, ProfileOp, SnippetOp,
    };
    use std::time::Duration;

    #[test]
    fn test_earliest_invalidate_wins() {
        let early = UNIX_EPOCH + Duration::from_secs(100);
        let late = UNIX_EPOCH + Duration::from_secs(200);
        let mut ops = Ops::new();
        InvalidateOp::at(late).add(&mut ops);
        ops.scoped(|ops| InvalidateOp::at(early).add(ops));
        let mut r = Router::new();
        r.frame(&ops);
        assert_eq!(r.wakeup_time(), Some(early));

        r.frame(&Ops::new());
        assert_eq!(r.wakeup_time(), None);
    }

    #[test]
    fn test_redraw_events_wake_immediately() {
        let k = HandlerKey::new();
        let mut ops = Ops::new();
        KeyInputOp::new(k).add(&mut ops);
        KeyFocusOp { key: Some(k) }.add(&mut ops);
        let mut r = Router::new();
        r.frame(&ops);
        // FocusEvent(true) asks for a redraw.
        assert_eq!(r.wakeup_time(), Some(UNIX_EPOCH));
        assert_eq!(r.focused(), Some(k));
    }

    #[test]
    fn test_new_pointer_handler_does_not_wake() {
        let k = HandlerKey::new();
        let mut ops = Ops::new();
        ops.scoped(|ops| {
            AreaOp::rect(Rect::new(0, 0, 10, 10)).add(ops);
            PointerInputOp::new(k, PointerKind::PRESS).add(ops);
        });
        let mut r = Router::new();
        r.frame(&ops);
        assert_eq!(r.wakeup_time(), None);
        assert_eq!(r.events(k).len(), 1);
    }

    #[test]
    fn test_key_events_need_focus() {
        let k = HandlerKey::new();
        let mut r = Router::new();
        let mut ops = Ops::new();
        KeyInputOp::new(k).add(&mut ops);
        r.frame(&ops);
        assert!(!r.queue(KeyEvent::press(KeyName::Character('a'), Modifiers::empty())));
        assert!(r.move_focus(FocusDirection::Forward));
        assert!(r.queue(KeyEvent::press(KeyName::Character('a'), Modifiers::empty())));
        let evts = r.events(k);
        assert!(matches!(evts.last(), Some(Event::Key(_))));
    }

    #[test]
    fn test_claimed_tab_reaches_focused_handler() {
        let (a, b) = (HandlerKey::new(), HandlerKey::new());
        let tab = KeyEvent::press(KeyName::Tab, Modifiers::empty());
        let mut r = Router::new();
        let mut ops = Ops::new();
        KeyInputOp::new(a).claim(FocusKeys::TAB).add(&mut ops);
        KeyInputOp::new(b).add(&mut ops);
        KeyFocusOp { key: Some(a) }.add(&mut ops);
        r.frame(&ops);
        r.take_events();
        assert!(r.queue_navigation(tab));
        assert!(matches!(r.events(a).last(), Some(Event::Key(_))));

        let mut ops = Ops::new();
        KeyInputOp::new(a).claim(FocusKeys::TAB).add(&mut ops);
        KeyInputOp::new(b).add(&mut ops);
        KeyFocusOp { key: Some(b) }.add(&mut ops);
        r.frame(&ops);
        r.take_events();
        assert!(!r.queue_navigation(tab));
        assert!(r.events(b).is_empty());
    }

    #[test]
    fn test_arrows_follow_layout() {
        // a b
        // c   d
        let keys: Vec<HandlerKey> = (0..4).map(|_| HandlerKey::new()).collect();
        let rects = [
            Rect::new(0, 0, 100, 40),
            Rect::new(110, 0, 190, 40),
            Rect::new(0, 50, 100, 90),
            Rect::new(220, 45, 320, 95),
        ];
        let mut ops = Ops::new();
        // Declared bottom-up so layout order differs from declaration order.
        for (k, rect) in keys.iter().zip(rects).rev() {
            ops.scoped(|ops| {
                AreaOp::rect(rect).add(ops);
                KeyInputOp::new(*k).add(ops);
            });
        }
        let mut r = Router::new();
        r.frame(&ops);
        let [a, b, c, d] = [keys[0], keys[1], keys[2], keys[3]];

        assert!(r.move_focus(FocusDirection::Right));
        assert_eq!(r.focused(), Some(a));
        assert!(r.move_focus(FocusDirection::Right));
        assert_eq!(r.focused(), Some(b));
        assert!(!r.move_focus(FocusDirection::Right));
        assert!(!r.move_focus(FocusDirection::Up));
        assert!(r.move_focus(FocusDirection::Down));
        assert_eq!(r.focused(), Some(c));
        assert!(r.move_focus(FocusDirection::Right));
        assert_eq!(r.focused(), Some(d));
        assert!(!r.move_focus(FocusDirection::Down));
        assert!(r.move_focus(FocusDirection::Up));
        assert_eq!(r.focused(), Some(b));
        assert!(r.move_focus(FocusDirection::Left));
        assert_eq!(r.focused(), Some(a));
        assert!(!r.move_focus(FocusDirection::Left));
    }

    #[test]
    fn test_snippet_request_expands() {
        let k = HandlerKey::new();
        let mut r = Router::new();
        let mut ops = Ops::new();
        KeyInputOp::new(k).add(&mut ops);
        KeyFocusOp { key: Some(k) }.add(&mut ops);
        r.frame(&ops);

        let mut ops = Ops::new();
        KeyInputOp::new(k).add(&mut ops);
        SnippetOp {
            key: k,
            snippet: crate::keyboard::Snippet {
                range: TextRange::new(5, 15),
                text: "0123456789".into(),
            },
        }
        .add(&mut ops);
        r.frame(&ops);
        r.take_events();

        assert!(r.queue(SnippetEvent(TextRange::new(10, 20))));
        assert_eq!(
            r.events(k),
            vec![Event::Snippet(SnippetEvent(TextRange::new(5, 20)))]
        );
    }

    #[test]
    fn test_clipboard_round_trip() {
        let k = HandlerKey::new();
        let mut r = Router::new();
        let mut ops = Ops::new();
        ClipboardReadOp { key: k }.add(&mut ops);
        ClipboardWriteOp::text("copied").add(&mut ops);
        r.frame(&ops);
        assert_eq!(r.write_clipboard(), Some(ClipboardEvent::text("copied")));
        assert!(r.clipboard_requested());
        assert!(r.queue(ClipboardEvent::text("pasted")));
        assert_eq!(
            r.events(k),
            vec![Event::Clipboard(ClipboardEvent::text("pasted"))]
        );
    }

    #[test]
    fn test_profile_subscribers() {
        let k = HandlerKey::new();
        let mut r = Router::new();
        assert!(!r.queue(ProfileEvent::default()));
        let mut ops = Ops::new();
        ProfileOp { key: k }.add(&mut ops);
        r.frame(&ops);
        assert!(r.profiling());
        assert!(r.queue(ProfileEvent {
            timings: "frame: 1ms".into()
        }));
        assert_eq!(r.events(k).len(), 1);
    }

    #[test]
    fn test_click_focus_taps_focused_area() {
        let k = HandlerKey::new();
        let mut r = Router::new();
        let mut ops = Ops::new();
        ops.scoped(|ops| {
            AreaOp::rect(Rect::new(10, 10, 30, 30)).add(ops);
            PointerInputOp::new(k, PointerKind::PRESS | PointerKind::RELEASE).add(ops);
            KeyInputOp::new(k).add(ops);
        });
        KeyFocusOp { key: Some(k) }.add(&mut ops);
        r.frame(&ops);
        r.take_events();

        r.click_focus();
        let kinds: Vec<PointerKind> = r
            .events(k)
            .iter()
            .filter_map(Event::as_pointer)
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds, vec![PointerKind::PRESS, PointerKind::RELEASE]);
    }
}
