//! Pull-based decoder over an [`Ops`] buffer.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use glam::{Affine2, Vec2};

use super::{AreaKind, AreaOp, KeyInputOp, OpType, Ops, PointerInputOp, SelectionOp};
use crate::geom::Rect;
use crate::handler::HandlerKey;
use crate::keyboard::{Caret, FocusKeys, InputHint, TextRange};
use crate::pointer::{Cursor, PointerKind};
use crate::semantic::SemanticClass;
use crate::system::Action;

/// A decoded record. Text and byte payloads borrow from the buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum Op<'a> {
    Push,
    Pop,
    Transform(Affine2),
    Area(AreaOp),
    PointerInput(PointerInputOp),
    Pass(bool),
    KeyInput(KeyInputOp),
    KeyFocus(Option<HandlerKey>),
    SoftKeyboard(bool),
    /// Deadline for the next frame. The Unix epoch means "immediately".
    Invalidate(SystemTime),
    Profile(HandlerKey),
    Cursor(Cursor),
    ActionInput(Action),
    ClipboardRead(HandlerKey),
    ClipboardWrite { mime: &'a str, data: &'a [u8] },
    Selection(SelectionOp),
    Snippet {
        key: HandlerKey,
        range: TextRange,
        text: &'a str,
    },
    SemanticLabel(&'a str),
    SemanticDescription(&'a str),
    SemanticClass(SemanticClass),
    SemanticSelected(bool),
    SemanticEnabled(bool),
}

/// Cursor over an operation stream.
///
/// Decoding validates every record: an unknown tag, a truncated payload, a
/// `Pop` without `Push` or a stream ending with open scopes panics, since
/// the stream is produced by trusted code in the same process.
pub struct OpsReader<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> OpsReader<'a> {
    pub fn new(ops: &'a Ops) -> Self {
        Self::from_bytes(ops.as_bytes())
    }

    pub fn from_bytes(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
        }
    }

    /// Current push/pop nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Decode the next record, or `None` at the end of a well-formed stream.
    pub fn decode(&mut self) -> Option<Op<'a>> {
        if self.pos == self.data.len() {
            if self.depth != 0 {
                panic!("ops: {} push scope(s) without matching pop", self.depth);
            }
            return None;
        }
        let tag = self.take_u8(None);
        let Some(ty) = OpType::from_u8(tag) else {
            panic!("ops: unknown tag {tag} at offset {}", self.pos - 1);
        };
        let at = Some(ty);
        let op = match ty {
            OpType::Push => {
                self.depth += 1;
                Op::Push
            }
            OpType::Pop => {
                if self.depth == 0 {
                    panic!("ops: pop without matching push at offset {}", self.pos - 1);
                }
                self.depth -= 1;
                Op::Pop
            }
            OpType::Transform => {
                let mut cols = [0f32; 6];
                for c in &mut cols {
                    *c = self.take_f32(at);
                }
                Op::Transform(Affine2::from_cols_array(&cols))
            }
            OpType::Area => {
                let kind = match self.take_u8(at) {
                    0 => AreaKind::Rect,
                    1 => AreaKind::Ellipse,
                    k => panic!("ops: invalid area kind {k}"),
                };
                let rect = Rect::new(
                    self.take_i32(at),
                    self.take_i32(at),
                    self.take_i32(at),
                    self.take_i32(at),
                );
                Op::Area(AreaOp { kind, rect })
            }
            OpType::PointerInput => {
                let grab = self.take_bool(at);
                let kinds = PointerKind::from_bits_truncate(self.take_u8(at));
                let key = self.take_key(at);
                Op::PointerInput(PointerInputOp { key, grab, kinds })
            }
            OpType::Pass => Op::Pass(self.take_bool(at)),
            OpType::KeyInput => {
                let hint = self.take_u8(at);
                let hint = InputHint::from_u8(hint)
                    .unwrap_or_else(|| panic!("ops: invalid input hint {hint}"));
                let claims = FocusKeys::from_bits_truncate(self.take_u8(at));
                let key = self.take_key(at);
                Op::KeyInput(KeyInputOp { key, hint, claims })
            }
            OpType::KeyFocus => Op::KeyFocus(HandlerKey::from_raw(self.take_u64(at))),
            OpType::SoftKeyboard => Op::SoftKeyboard(self.take_bool(at)),
            OpType::Invalidate => {
                let nanos = self.take_u64(at);
                Op::Invalidate(UNIX_EPOCH + Duration::from_nanos(nanos))
            }
            OpType::Profile => Op::Profile(self.take_key(at)),
            OpType::Cursor => {
                let c = self.take_u8(at);
                Op::Cursor(Cursor::from_u8(c).unwrap_or_else(|| panic!("ops: invalid cursor {c}")))
            }
            OpType::ActionInput => Op::ActionInput(Action::from_bits_truncate(self.take_u16(at))),
            OpType::ClipboardRead => Op::ClipboardRead(self.take_key(at)),
            OpType::ClipboardWrite => {
                let mime = self.take_str(at);
                let data = self.take_blob(at);
                Op::ClipboardWrite { mime, data }
            }
            OpType::Selection => {
                let key = self.take_key(at);
                let range = TextRange::new(self.take_i32(at), self.take_i32(at));
                let pos = Vec2::new(self.take_f32(at), self.take_f32(at));
                let caret = Caret {
                    pos,
                    ascent: self.take_f32(at),
                    descent: self.take_f32(at),
                };
                Op::Selection(SelectionOp { key, range, caret })
            }
            OpType::Snippet => {
                let key = self.take_key(at);
                let range = TextRange::new(self.take_i32(at), self.take_i32(at));
                let text = self.take_str(at);
                Op::Snippet { key, range, text }
            }
            OpType::SemanticLabel => Op::SemanticLabel(self.take_str(at)),
            OpType::SemanticDescription => Op::SemanticDescription(self.take_str(at)),
            OpType::SemanticClass => {
                let c = self.take_u8(at);
                Op::SemanticClass(
                    SemanticClass::from_u8(c).unwrap_or_else(|| panic!("ops: invalid semantic class {c}")),
                )
            }
            OpType::SemanticSelected => Op::SemanticSelected(self.take_bool(at)),
            OpType::SemanticEnabled => Op::SemanticEnabled(self.take_bool(at)),
        };
        Some(op)
    }

    fn take(&mut self, n: usize, ty: Option<OpType>) -> &'a [u8] {
        let end = self.pos + n;
        if end > self.data.len() {
            panic!(
                "ops: truncated {:?} record at offset {} (need {n} bytes, {} left)",
                ty,
                self.pos,
                self.data.len() - self.pos
            );
        }
        let s = &self.data[self.pos..end];
        self.pos = end;
        s
    }

    fn take_array<const N: usize>(&mut self, ty: Option<OpType>) -> [u8; N] {
        let mut a = [0u8; N];
        a.copy_from_slice(self.take(N, ty));
        a
    }

    fn take_u8(&mut self, ty: Option<OpType>) -> u8 {
        self.take(1, ty)[0]
    }

    fn take_bool(&mut self, ty: Option<OpType>) -> bool {
        self.take_u8(ty) != 0
    }

    fn take_u16(&mut self, ty: Option<OpType>) -> u16 {
        u16::from_le_bytes(self.take_array(ty))
    }

    fn take_u32(&mut self, ty: Option<OpType>) -> u32 {
        u32::from_le_bytes(self.take_array(ty))
    }

    fn take_i32(&mut self, ty: Option<OpType>) -> i32 {
        i32::from_le_bytes(self.take_array(ty))
    }

    fn take_u64(&mut self, ty: Option<OpType>) -> u64 {
        u64::from_le_bytes(self.take_array(ty))
    }

    fn take_f32(&mut self, ty: Option<OpType>) -> f32 {
        f32::from_le_bytes(self.take_array(ty))
    }

    fn take_key(&mut self, ty: Option<OpType>) -> HandlerKey {
        HandlerKey::from_raw(self.take_u64(ty))
            .unwrap_or_else(|| panic!("ops: {ty:?} record without handler key"))
    }

    fn take_blob(&mut self, ty: Option<OpType>) -> &'a [u8] {
        let len = self.take_u32(ty) as usize;
        self.take(len, ty)
    }

    fn take_str(&mut self, ty: Option<OpType>) -> &'a str {
        let b = self.take_blob(ty);
        std::str::from_utf8(b).unwrap_or_else(|e| panic!("ops: invalid utf-8 in {ty:?} record: {e}"))
    }
}

impl<'a> Iterator for OpsReader<'a> {
    type Item = Op<'a>;

    fn next(&mut self) -> Option<Op<'a>> {
        self.decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::*;

    fn decode_all(ops: &Ops) -> Vec<Op<'_>> {
        OpsReader::new(ops).collect()
    }

    #[test]
    fn test_decode_scoped_stream() {
        let key = HandlerKey::new();
        let mut ops = Ops::new();
        ops.scoped(|ops| {
            TransformOp::offset(10.0, 20.0).add(ops);
            AreaOp::rect(Rect::new(0, 0, 10, 10)).add(ops);
            PointerInputOp::new(key, PointerKind::PRESS).grab(true).add(ops);
        });
        PassOp { pass: true }.add(&mut ops);
        let decoded = decode_all(&ops);
        assert_eq!(decoded.len(), 6);
        assert_eq!(decoded[0], Op::Push);
        assert_eq!(
            decoded[1],
            Op::Transform(Affine2::from_translation(Vec2::new(10.0, 20.0)))
        );
        assert_eq!(decoded[2], Op::Area(AreaOp::rect(Rect::new(0, 0, 10, 10))));
        assert_eq!(
            decoded[3],
            Op::PointerInput(PointerInputOp {
                key,
                grab: true,
                kinds: PointerKind::PRESS
            })
        );
        assert_eq!(decoded[4], Op::Pop);
        assert_eq!(decoded[5], Op::Pass(true));
    }

    #[test]
    fn test_decode_variable_length_records() {
        let key = HandlerKey::new();
        let mut ops = Ops::new();
        ClipboardWriteOp::text("héllo").add(&mut ops);
        SnippetOp {
            key,
            snippet: crate::keyboard::Snippet {
                range: TextRange::new(3, 5),
                text: "ab".into(),
            },
        }
        .add(&mut ops);
        SemanticLabelOp("Save".into()).add(&mut ops);
        let decoded = decode_all(&ops);
        assert_eq!(
            decoded[0],
            Op::ClipboardWrite {
                mime: "text/plain",
                data: "héllo".as_bytes()
            }
        );
        assert_eq!(
            decoded[1],
            Op::Snippet {
                key,
                range: TextRange::new(3, 5),
                text: "ab"
            }
        );
        assert_eq!(decoded[2], Op::SemanticLabel("Save"));
    }

    #[test]
    fn test_invalidate_deadline() {
        let at = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let mut ops = Ops::new();
        InvalidateOp::at(at).add(&mut ops);
        InvalidateOp::default().add(&mut ops);
        let decoded = decode_all(&ops);
        assert_eq!(decoded[0], Op::Invalidate(at));
        assert_eq!(decoded[1], Op::Invalidate(UNIX_EPOCH));
    }

    #[test]
    #[should_panic(expected = "without matching pop")]
    fn test_unmatched_push_panics() {
        let mut ops = Ops::new();
        ops.push();
        decode_all(&ops);
    }

    #[test]
    #[should_panic(expected = "pop without matching push")]
    fn test_unmatched_pop_panics() {
        let mut ops = Ops::new();
        ops.pop();
        decode_all(&ops);
    }

    #[test]
    #[should_panic(expected = "unknown tag")]
    fn test_unknown_tag_panics() {
        let ops = Ops::from_bytes(vec![0xff]);
        decode_all(&ops);
    }

    #[test]
    #[should_panic(expected = "truncated")]
    fn test_truncated_payload_panics() {
        let mut ops = Ops::new();
        AreaOp::rect(Rect::new(0, 0, 1, 1)).add(&mut ops);
        let mut bytes = ops.as_bytes().to_vec();
        bytes.truncate(bytes.len() - 2);
        decode_all(&Ops::from_bytes(bytes));
    }
}
