//! Key focus and text-input routing.

use std::collections::HashMap;

use glam::Affine2;

use super::{
    EditorState, FocusDirection, FocusEvent, FocusKeys, InputHint, KeyEvent, Selection,
    TextInputState,
};
use crate::event::Event;
use crate::geom::Rect;
use crate::handler::{HandlerEvents, HandlerKey};
use crate::ops::{Op, Ops, OpsReader};
use crate::pointer::Scope;

#[derive(Debug)]
struct KeyHandler {
    /// Declared during the current frame.
    visible: bool,
    /// First frame the handler is declared in.
    new: bool,
    hint: InputHint,
    claims: FocusKeys,
    bounds: Rect,
    area: isize,
}

/// A handler's place in the row layout used for directional focus moves.
#[derive(Debug, Clone, Copy)]
struct RowEntry {
    key: HandlerKey,
    row: usize,
    bounds: Rect,
}

/// Focus requests collected while decoding a frame.
#[derive(Debug, Default)]
struct Pending {
    focus: Option<Option<HandlerKey>>,
    soft_keyboard: Option<bool>,
}

/// Delivers key, edit and focus events to the single focused handler.
#[derive(Debug, Default)]
pub struct KeyQueue {
    focus: Option<HandlerKey>,
    handlers: HashMap<HandlerKey, KeyHandler>,
    /// Handlers in declaration order, for focus traversal.
    order: Vec<HandlerKey>,
    /// Handlers sorted top to bottom by row, then left to right.
    rows: Vec<RowEntry>,
    state: TextInputState,
    hint: InputHint,
    content: EditorState,
    pending: Pending,
}

impl KeyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update handlers and focus from a frame's operations.
    pub fn frame(&mut self, ops: &Ops, events: &mut HandlerEvents) {
        self.begin_frame();
        let mut scope = Scope {
            transform: Affine2::IDENTITY,
            area: -1,
            node: -1,
            pass: false,
        };
        let mut stack = Vec::new();
        for op in OpsReader::new(ops) {
            if !scope.apply(&mut stack, &op) {
                self.collect(&op, &scope, Rect::default());
            }
        }
        self.end_frame(events);
    }

    pub(crate) fn begin_frame(&mut self) {
        for h in self.handlers.values_mut() {
            h.visible = false;
        }
        self.order.clear();
        self.pending = Pending::default();
    }

    /// Record a key-related operation. `bounds` is the window-space extent of
    /// the enclosing area.
    pub(crate) fn collect(&mut self, op: &Op<'_>, scope: &Scope, bounds: Rect) {
        match op {
            Op::KeyInput(input) => {
                let h = self.handlers.entry(input.key).or_insert_with(|| KeyHandler {
                    visible: false,
                    new: true,
                    hint: InputHint::Any,
                    claims: FocusKeys::empty(),
                    bounds: Rect::default(),
                    area: -1,
                });
                if !h.visible {
                    self.order.push(input.key);
                }
                h.visible = true;
                h.hint = input.hint;
                h.claims = input.claims;
                h.bounds = bounds;
                h.area = scope.area;
            }
            Op::KeyFocus(focus) => self.pending.focus = Some(*focus),
            Op::SoftKeyboard(show) => self.pending.soft_keyboard = Some(*show),
            Op::Selection(sel) if Some(sel.key) == self.focus => {
                self.content.selection = Selection {
                    range: sel.range,
                    caret: sel.caret,
                    transform: scope.transform,
                };
            }
            Op::Snippet { key, range, text } if Some(*key) == self.focus => {
                self.content.snippet.range = *range;
                self.content.snippet.text = (*text).to_owned();
            }
            _ => {}
        }
    }

    pub(crate) fn end_frame(&mut self, events: &mut HandlerEvents) {
        profiling::profile_scope!("KeyQueue::end_frame");
        let pending_focus = self.pending.focus;
        let mut gone = Vec::new();
        for (k, h) in &mut self.handlers {
            if !h.visible {
                gone.push(*k);
            } else if h.new && Some(*k) != pending_focus.flatten() {
                events.add_no_redraw(*k, FocusEvent { focus: false });
            }
            h.new = false;
        }
        for k in gone {
            self.handlers.remove(&k);
            if self.focus == Some(k) {
                tracing::debug!(key = k.raw(), "focused key handler disappeared");
                self.focus = None;
                self.content = EditorState::default();
                self.state = TextInputState::Close;
            }
        }
        self.update_rows();
        if let Some(focus) = pending_focus {
            self.set_focus(focus, events);
        }
        match self.pending.soft_keyboard {
            Some(true) => self.state = TextInputState::Open,
            Some(false) => self.state = TextInputState::Close,
            None => {}
        }
    }

    /// Move focus to `focus`, notifying the old and new handlers. Unknown
    /// keys clear the focus.
    pub fn set_focus(&mut self, focus: Option<HandlerKey>, events: &mut HandlerEvents) {
        let focus = focus.filter(|k| self.handlers.contains_key(k));
        if focus == self.focus {
            return;
        }
        self.content = EditorState::default();
        if let Some(old) = self.focus {
            events.add(old, FocusEvent { focus: false });
        }
        self.focus = focus;
        if let Some(new) = focus {
            events.add(new, FocusEvent { focus: true });
        }
        if self.focus.is_none() || self.state == TextInputState::Keep {
            self.state = TextInputState::Close;
        }
    }

    /// Partition the visible handlers into rows. The topmost handler
    /// starts a row, and every following handler whose vertical center is not
    /// below the row's bottom edge joins it. Rows are sorted left to right.
    fn update_rows(&mut self) {
        let mut rows: Vec<RowEntry> = self
            .order
            .iter()
            .filter_map(|k| {
                let h = self.handlers.get(k)?;
                Some(RowEntry {
                    key: *k,
                    row: 0,
                    bounds: h.bounds,
                })
            })
            .collect();
        rows.sort_by_key(|e| e.bounds.min.y);
        let (mut start, mut row) = (0, 0);
        while start < rows.len() {
            let bottom = rows[start].bounds.max.y;
            rows[start].row = row;
            let mut end = start + 1;
            while end < rows.len() {
                let b = rows[end].bounds;
                if (b.min.y + b.max.y) / 2 > bottom {
                    break;
                }
                rows[end].row = row;
                end += 1;
            }
            rows[start..end].sort_by_key(|e| e.bounds.min.x);
            start = end;
            row += 1;
        }
        self.rows = rows;
    }

    /// Move focus in `dir`. Forward and backward wrap around the
    /// declaration order; directional moves stop at the layout's edges.
    /// Returns whether the focus changed.
    pub fn move_focus(&mut self, dir: FocusDirection, events: &mut HandlerEvents) -> bool {
        let target = match dir {
            FocusDirection::Forward | FocusDirection::Backward => self.next_in_order(dir),
            FocusDirection::Left | FocusDirection::Right => self.next_in_row(dir),
            FocusDirection::Up | FocusDirection::Down => self.closest_in_next_row(dir),
        };
        match target {
            Some(t) if Some(t) != self.focus => {
                tracing::trace!(key = t.raw(), ?dir, "focus moved");
                self.set_focus(Some(t), events);
                true
            }
            _ => false,
        }
    }

    fn next_in_order(&self, dir: FocusDirection) -> Option<HandlerKey> {
        let n = self.order.len();
        if n == 0 {
            return None;
        }
        let current = self
            .focus
            .and_then(|f| self.order.iter().position(|k| *k == f));
        let next = match (current, dir) {
            (None, FocusDirection::Backward) => n - 1,
            (None, _) => 0,
            (Some(i), FocusDirection::Backward) => (i + n - 1) % n,
            (Some(i), _) => (i + 1) % n,
        };
        Some(self.order[next])
    }

    /// Position of the focused handler in the row layout.
    fn row_position(&self) -> Option<usize> {
        let f = self.focus?;
        self.rows.iter().position(|e| e.key == f)
    }

    /// The horizontal neighbour of the focused handler within its row.
    /// Without focus, the first handler of the layout.
    fn next_in_row(&self, dir: FocusDirection) -> Option<HandlerKey> {
        let current = self.row_position();
        let row = self.rows.get(current.unwrap_or(0))?.row;
        let next = match current {
            None => Some(0),
            Some(i) if dir == FocusDirection::Left => i.checked_sub(1),
            Some(i) => Some(i + 1),
        }?;
        self.rows
            .get(next)
            .filter(|e| e.row == row)
            .map(|e| e.key)
    }

    /// The handler in the row above or below whose horizontal center is
    /// closest to the focused handler's. Without focus, searches the first
    /// row.
    fn closest_in_next_row(&self, dir: FocusDirection) -> Option<HandlerKey> {
        let current = self.row_position();
        let start = current.unwrap_or(0);
        let from = self.rows.get(start)?;
        let up = dir == FocusDirection::Up;
        let target = match current {
            None => 0,
            Some(_) if up => from.row.checked_sub(1)?,
            Some(_) => from.row + 1,
        };
        let beyond = if up {
            target.checked_sub(1)
        } else {
            Some(target + 1)
        };
        let center = (from.bounds.min.x + from.bounds.max.x) / 2;
        let mut closest = None;
        let mut dist = i32::MAX;
        let mut i = Some(start);
        while let Some(e) = i.and_then(|i| self.rows.get(i)) {
            if e.row == target {
                let d = (center - (e.bounds.min.x + e.bounds.max.x) / 2).abs();
                if d > dist {
                    break;
                }
                dist = d;
                closest = Some(e.key);
            } else if Some(e.row) == beyond {
                break;
            }
            i = if up {
                i.and_then(|i| i.checked_sub(1))
            } else {
                i.map(|i| i + 1)
            };
        }
        closest
    }

    /// Deliver a focus-moving key press to the focused handler, but only
    /// when it claimed that key. Returns false when the press should move
    /// focus instead.
    pub fn push_navigation(&mut self, e: KeyEvent, events: &mut HandlerEvents) -> bool {
        let keys = FocusKeys::of(e.name);
        let Some(k) = self.focus else {
            return false;
        };
        let claimed = self
            .handlers
            .get(&k)
            .is_some_and(|h| !keys.is_empty() && h.claims.contains(keys));
        if claimed {
            events.add(k, e);
        }
        claimed
    }

    /// Deliver `e` to the focused handler. Returns false when nothing has
    /// focus.
    pub fn push(&mut self, e: impl Into<Event>, events: &mut HandlerEvents) -> bool {
        match self.focus {
            Some(k) => {
                events.add(k, e);
                true
            }
            None => false,
        }
    }

    pub fn focus(&self) -> Option<HandlerKey> {
        self.focus
    }

    /// Requested on-screen keyboard state, reset to `Keep` once read.
    pub fn take_text_input_state(&mut self) -> TextInputState {
        std::mem::take(&mut self.state)
    }

    /// Input hint of the focused handler, and whether it changed since the
    /// last call.
    pub fn input_hint(&mut self) -> (InputHint, bool) {
        let Some(focused) = self.focus.and_then(|k| self.handlers.get(&k)) else {
            return (self.hint, false);
        };
        let old = self.hint;
        self.hint = focused.hint;
        (self.hint, old != self.hint)
    }

    /// Selection and snippet published by the focused handler.
    pub fn editor_state(&self) -> &EditorState {
        &self.content
    }

    /// Window bounds and area index of the focused handler.
    pub(crate) fn focused_area(&self) -> Option<(Rect, isize)> {
        let h = self.handlers.get(&self.focus?)?;
        Some((h.bounds, h.area))
    }
}
