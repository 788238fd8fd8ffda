//! Operation stream
//!
//! Client code records one [`Ops`] buffer per frame: a flat, append-only
//! sequence of tagged little-endian records describing clip areas,
//! transforms and input-handler declarations. Nesting is expressed by
//! `Push`/`Pop` records in stream order rather than by an explicit tree.
//!
//! ```text
//!  ┌─────┬──────────────────────┐
//!  │ tag │ payload (fixed or    │   strings and byte blobs are
//!  │ u8  │ length-prefixed)     │   prefixed with a u32 length
//!  └─────┴──────────────────────┘
//! ```
//!
//! The stream is produced and consumed inside one process; it carries no
//! version and malformed input is treated as a programming error.

mod reader;

pub use reader::{Op, OpsReader};

use std::time::{SystemTime, UNIX_EPOCH};

use glam::Affine2;

use crate::geom::Rect;
use crate::handler::HandlerKey;
use crate::keyboard::{Caret, FocusKeys, InputHint, Snippet, TextRange};
use crate::pointer::{Cursor, PointerKind};
use crate::semantic::SemanticClass;
use crate::system::Action;

/// Record tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpType {
    Push = 1,
    Pop,
    Transform,
    Area,
    PointerInput,
    Pass,
    KeyInput,
    KeyFocus,
    SoftKeyboard,
    Invalidate,
    Profile,
    Cursor,
    ActionInput,
    ClipboardRead,
    ClipboardWrite,
    Selection,
    Snippet,
    SemanticLabel,
    SemanticDescription,
    SemanticClass,
    SemanticSelected,
    SemanticEnabled,
}

impl OpType {
    pub fn from_u8(tag: u8) -> Option<Self> {
        use OpType::*;
        const TYPES: [OpType; 22] = [
            Push,
            Pop,
            Transform,
            Area,
            PointerInput,
            Pass,
            KeyInput,
            KeyFocus,
            SoftKeyboard,
            Invalidate,
            Profile,
            Cursor,
            ActionInput,
            ClipboardRead,
            ClipboardWrite,
            Selection,
            Snippet,
            SemanticLabel,
            SemanticDescription,
            SemanticClass,
            SemanticSelected,
            SemanticEnabled,
        ];
        TYPES.get((tag as usize).wrapping_sub(1)).copied()
    }
}

/// One frame's worth of recorded operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ops {
    data: Vec<u8>,
}

impl Ops {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the buffer, keeping its allocation for the next frame.
    pub fn reset(&mut self) {
        self.data.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Splice all records of `other` onto this stream.
    pub fn append(&mut self, other: &Ops) {
        self.data.extend_from_slice(&other.data);
    }

    /// Open a scope. Transform, clip area and pass state declared inside
    /// the scope are discarded by the matching [`Ops::pop`].
    pub fn push(&mut self) {
        self.put_type(OpType::Push);
    }

    pub fn pop(&mut self) {
        self.put_type(OpType::Pop);
    }

    /// Record `f` inside a push/pop scope.
    pub fn scoped(&mut self, f: impl FnOnce(&mut Ops)) {
        self.push();
        f(self);
        self.pop();
    }

    fn put_type(&mut self, ty: OpType) {
        self.data.push(ty as u8);
    }

    fn put_u8(&mut self, v: u8) {
        self.data.push(v);
    }

    fn put_bool(&mut self, v: bool) {
        self.data.push(v as u8);
    }

    fn put_u16(&mut self, v: u16) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    fn put_u32(&mut self, v: u32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    fn put_i32(&mut self, v: i32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    fn put_u64(&mut self, v: u64) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    fn put_f32(&mut self, v: f32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    fn put_key(&mut self, key: Option<HandlerKey>) {
        self.put_u64(key.map_or(0, HandlerKey::raw));
    }

    fn put_blob(&mut self, b: &[u8]) {
        let len = u32::try_from(b.len()).unwrap_or_else(|_| panic!("ops: blob of {} bytes exceeds u32", b.len()));
        self.put_u32(len);
        self.data.extend_from_slice(b);
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }
}

/// Coordinate transform applied to everything that follows in the current
/// scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformOp(pub Affine2);

impl TransformOp {
    pub fn offset(x: f32, y: f32) -> Self {
        Self(Affine2::from_translation(glam::Vec2::new(x, y)))
    }

    pub fn add(&self, ops: &mut Ops) {
        ops.put_type(OpType::Transform);
        for v in self.0.to_cols_array() {
            ops.put_f32(v);
        }
    }
}

/// Shape of a clip area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AreaKind {
    Rect = 0,
    Ellipse = 1,
}

/// Clip area restricting the hit region of every handler declared after it
/// in the current scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AreaOp {
    pub kind: AreaKind,
    pub rect: Rect,
}

impl AreaOp {
    pub fn rect(rect: Rect) -> Self {
        Self {
            kind: AreaKind::Rect,
            rect,
        }
    }

    /// Ellipse inscribed in `rect`.
    pub fn ellipse(rect: Rect) -> Self {
        Self {
            kind: AreaKind::Ellipse,
            rect,
        }
    }

    pub fn add(&self, ops: &mut Ops) {
        ops.put_type(OpType::Area);
        ops.put_u8(self.kind as u8);
        ops.put_i32(self.rect.min.x);
        ops.put_i32(self.rect.min.y);
        ops.put_i32(self.rect.max.x);
        ops.put_i32(self.rect.max.y);
    }

    /// Hit test in the area's local coordinates.
    pub fn hit(&self, p: glam::Vec2) -> bool {
        let pos = p - self.rect.min.as_vec2();
        let size = self.rect.size().as_vec2();
        match self.kind {
            AreaKind::Rect => 0.0 <= pos.x && pos.x < size.x && 0.0 <= pos.y && pos.y < size.y,
            AreaKind::Ellipse => {
                let rx = size.x / 2.0;
                let ry = size.y / 2.0;
                let xh = pos.x - rx;
                let yk = pos.y - ry;
                // Degenerate ellipses yield NaN, which never compares <= 1.
                (xh * xh) / (rx * rx) + (yk * yk) / (ry * ry) <= 1.0
            }
        }
    }
}

/// Declares that events in the current area may pass through to handlers
/// declared earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassOp {
    pub pass: bool,
}

impl PassOp {
    pub fn add(&self, ops: &mut Ops) {
        ops.put_type(OpType::Pass);
        ops.put_bool(self.pass);
    }
}

/// Declares a pointer handler over the current area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointerInputOp {
    pub key: HandlerKey,
    /// Request exclusive delivery while a pointer is pressed.
    pub grab: bool,
    /// Event kinds the handler wants.
    pub kinds: PointerKind,
}

impl PointerInputOp {
    pub fn new(key: HandlerKey, kinds: PointerKind) -> Self {
        Self {
            key,
            grab: false,
            kinds,
        }
    }

    pub fn grab(mut self, grab: bool) -> Self {
        self.grab = grab;
        self
    }

    pub fn add(&self, ops: &mut Ops) {
        ops.put_type(OpType::PointerInput);
        ops.put_bool(self.grab);
        ops.put_u8(self.kinds.bits());
        ops.put_key(Some(self.key));
    }
}

/// Declares a key handler, eligible for keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyInputOp {
    pub key: HandlerKey,
    pub hint: InputHint,
    /// Navigation keys delivered to the handler while focused, instead of
    /// moving focus.
    pub claims: FocusKeys,
}

impl KeyInputOp {
    pub fn new(key: HandlerKey) -> Self {
        Self {
            key,
            hint: InputHint::Any,
            claims: FocusKeys::empty(),
        }
    }

    pub fn hint(mut self, hint: InputHint) -> Self {
        self.hint = hint;
        self
    }

    pub fn claim(mut self, keys: FocusKeys) -> Self {
        self.claims |= keys;
        self
    }

    pub fn add(&self, ops: &mut Ops) {
        ops.put_type(OpType::KeyInput);
        ops.put_u8(self.hint as u8);
        ops.put_u8(self.claims.bits());
        ops.put_key(Some(self.key));
    }
}

/// Moves keyboard focus to a handler, or clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyFocusOp {
    pub key: Option<HandlerKey>,
}

impl KeyFocusOp {
    pub fn add(&self, ops: &mut Ops) {
        ops.put_type(OpType::KeyFocus);
        ops.put_key(self.key);
    }
}

/// Shows or hides the on-screen keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoftKeyboardOp {
    pub show: bool,
}

impl SoftKeyboardOp {
    pub fn add(&self, ops: &mut Ops) {
        ops.put_type(OpType::SoftKeyboard);
        ops.put_bool(self.show);
    }
}

/// Requests another frame, immediately or at a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InvalidateOp {
    pub at: Option<SystemTime>,
}

impl InvalidateOp {
    pub fn at(at: SystemTime) -> Self {
        Self { at: Some(at) }
    }

    pub fn add(&self, ops: &mut Ops) {
        ops.put_type(OpType::Invalidate);
        let nanos = self
            .at
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX));
        ops.put_u64(nanos);
    }
}

/// Subscribes a handler to per-frame profiling summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProfileOp {
    pub key: HandlerKey,
}

impl ProfileOp {
    pub fn add(&self, ops: &mut Ops) {
        ops.put_type(OpType::Profile);
        ops.put_key(Some(self.key));
    }
}

/// Cursor shown while the pointer is over the current area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorOp(pub Cursor);

impl CursorOp {
    pub fn add(&self, ops: &mut Ops) {
        ops.put_type(OpType::Cursor);
        ops.put_u8(self.0 as u8);
    }
}

/// Maps the current area to a system action, such as the title bar
/// moving the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionInputOp(pub Action);

impl ActionInputOp {
    pub fn add(&self, ops: &mut Ops) {
        ops.put_type(OpType::ActionInput);
        ops.put_u16(self.0.bits());
    }
}

/// Asks for the clipboard content to be delivered to a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipboardReadOp {
    pub key: HandlerKey,
}

impl ClipboardReadOp {
    pub fn add(&self, ops: &mut Ops) {
        ops.put_type(OpType::ClipboardRead);
        ops.put_key(Some(self.key));
    }
}

/// Writes content to the clipboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClipboardWriteOp {
    pub mime: String,
    pub data: Vec<u8>,
}

impl ClipboardWriteOp {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            mime: "text/plain".into(),
            data: text.into().into_bytes(),
        }
    }

    pub fn add(&self, ops: &mut Ops) {
        ops.put_type(OpType::ClipboardWrite);
        ops.put_blob(self.mime.as_bytes());
        ops.put_blob(&self.data);
    }
}

/// Publishes the selection and caret of an editor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionOp {
    pub key: HandlerKey,
    pub range: TextRange,
    pub caret: Caret,
}

impl SelectionOp {
    pub fn add(&self, ops: &mut Ops) {
        ops.put_type(OpType::Selection);
        ops.put_key(Some(self.key));
        ops.put_i32(self.range.start);
        ops.put_i32(self.range.end);
        ops.put_f32(self.caret.pos.x);
        ops.put_f32(self.caret.pos.y);
        ops.put_f32(self.caret.ascent);
        ops.put_f32(self.caret.descent);
    }
}

/// Publishes a snippet of an editor's text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnippetOp {
    pub key: HandlerKey,
    pub snippet: Snippet,
}

impl SnippetOp {
    pub fn add(&self, ops: &mut Ops) {
        ops.put_type(OpType::Snippet);
        ops.put_key(Some(self.key));
        ops.put_i32(self.snippet.range.start);
        ops.put_i32(self.snippet.range.end);
        ops.put_blob(self.snippet.text.as_bytes());
    }
}

/// Accessibility label of the current area.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticLabelOp(pub String);

impl SemanticLabelOp {
    pub fn add(&self, ops: &mut Ops) {
        ops.put_type(OpType::SemanticLabel);
        ops.put_blob(self.0.as_bytes());
    }
}

/// Accessibility description of the current area.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticDescriptionOp(pub String);

impl SemanticDescriptionOp {
    pub fn add(&self, ops: &mut Ops) {
        ops.put_type(OpType::SemanticDescription);
        ops.put_blob(self.0.as_bytes());
    }
}

/// Accessibility class of the current area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemanticClassOp(pub SemanticClass);

impl SemanticClassOp {
    pub fn add(&self, ops: &mut Ops) {
        ops.put_type(OpType::SemanticClass);
        ops.put_u8(self.0 as u8);
    }
}

/// Selected state of the current area, for check boxes and the like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemanticSelectedOp(pub bool);

impl SemanticSelectedOp {
    pub fn add(&self, ops: &mut Ops) {
        ops.put_type(OpType::SemanticSelected);
        ops.put_bool(self.0);
    }
}

/// Enabled state of the current area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemanticEnabledOp(pub bool);

impl SemanticEnabledOp {
    pub fn add(&self, ops: &mut Ops) {
        ops.put_type(OpType::SemanticEnabled);
        ops.put_bool(self.0);
    }
}
