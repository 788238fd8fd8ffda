//! Editor state as seen by a platform input method.
//!
//! Input methods edit text through rune ranges (or UTF-16 ranges on some
//! platforms) before the client has had a chance to apply the edit and
//! publish a fresh [`EditorState`]. [`ImeState`] mirrors those edits locally
//! so consecutive IME callbacks observe consistent selection, composition
//! and snippet ranges.
//!
//! Index translation is exact only inside the cached snippet. Outside of it
//! every rune is assumed to be one UTF-16 unit; callers that need precise
//! offsets must keep the snippet covering the text they index.

use crate::keyboard::{EditorState, Snippet, TextRange};

/// Editor state plus the composing region of the input method.
#[derive(Debug, Clone, PartialEq)]
pub struct ImeState {
    pub editor: EditorState,
    /// Composing region, or [`TextRange::NONE`].
    pub compose: TextRange,
}

impl Default for ImeState {
    fn default() -> Self {
        Self {
            editor: EditorState::default(),
            compose: TextRange::NONE,
        }
    }
}

impl ImeState {
    pub fn new(editor: EditorState) -> Self {
        Self {
            editor,
            compose: TextRange::NONE,
        }
    }

    /// Replace the runes in `range` with `text`.
    ///
    /// Selection and composition endpoints after the edit shift by the
    /// change in length; endpoints inside the replaced range collapse to its
    /// new end. The snippet absorbs the edit, or is replaced by it when the
    /// two do not overlap. Replaying an edit over its own result is a no-op.
    pub fn replace(&mut self, range: TextRange, text: &str) {
        let r = range.normalized();
        let runes: Vec<char> = text.chars().collect();
        let new_end = r.start + runes.len() as i32;
        let adjust = |pos: i32| -> i32 {
            if new_end < pos && pos <= r.end {
                new_end
            } else if r.end < pos {
                pos + (new_end - r.end)
            } else {
                pos
            }
        };

        let sel = &mut self.editor.selection.range;
        sel.start = adjust(sel.start);
        sel.end = adjust(sel.end);
        if self.compose.start != -1 {
            self.compose.start = adjust(self.compose.start);
            self.compose.end = adjust(self.compose.end);
        }

        let mut s = std::mem::take(&mut self.editor.snippet);
        if r.end < s.range.start || r.start > s.range.end {
            s = Snippet {
                range: TextRange::new(r.start, r.start),
                text: String::new(),
            };
        }
        let old: Vec<char> = s.text.chars().collect();
        let mut spliced = String::with_capacity(s.text.len() + text.len());
        let head = (r.start - s.range.start).max(0) as usize;
        spliced.extend(old.iter().take(head));
        spliced.push_str(text);
        if r.end < s.range.end {
            let tail = (r.end - s.range.start).max(0) as usize;
            spliced.extend(old.iter().skip(tail));
        }
        if r.start < s.range.start {
            s.range.start = r.start;
        }
        s.range.end = s.range.start + spliced.chars().count() as i32;
        s.text = spliced;
        self.editor.snippet = s;
    }

    /// Convert a rune offset to a UTF-16 offset. `-1` is passed through.
    pub fn utf16_index(&self, runes: i32) -> i32 {
        if runes == -1 {
            return -1;
        }
        let snippet = &self.editor.snippet;
        if runes < snippet.range.start {
            return runes;
        }
        let mut chars = snippet.range.start;
        let mut runes = runes - snippet.range.start;
        for c in snippet.text.chars() {
            if runes == 0 {
                break;
            }
            runes -= 1;
            chars += c.len_utf16() as i32;
        }
        chars + runes
    }

    /// Convert a UTF-16 offset to a rune offset. `-1` is passed through.
    pub fn runes_index(&self, chars: i32) -> i32 {
        if chars == -1 {
            return -1;
        }
        let snippet = &self.editor.snippet;
        if chars < snippet.range.start {
            return chars;
        }
        let mut runes = snippet.range.start;
        let mut chars = chars - snippet.range.start;
        for c in snippet.text.chars() {
            if chars == 0 {
                break;
            }
            chars -= c.len_utf16() as i32;
            runes += 1;
        }
        runes + chars
    }
}

/// Whether two snippets agree on the text of their overlap. A mismatch means
/// the client's text and the input method's view of it diverged.
pub fn snippets_consistent(old: &Snippet, new: &Snippet) -> bool {
    let start = old.range.start.max(new.range.start);
    let end = old.range.end.max(start).min(new.range.end);
    let r = TextRange::new(start, end);
    old.substring(r) == new.substring(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn state_with_snippet(start: i32, text: &str) -> ImeState {
        ImeState::new(EditorState {
            snippet: Snippet {
                range: TextRange::new(start, start + text.chars().count() as i32),
                text: text.to_owned(),
            },
            ..Default::default()
        })
    }

    #[test]
    fn test_indices_around_astral_char() {
        let s = state_with_snippet(10, "Hello, 😀");
        let pairs = [(0, 0), (10, 10), (17, 17), (18, 19), (30, 31)];
        for (runes, utf16) in pairs {
            assert_eq!(s.utf16_index(runes), utf16, "runes {runes}");
            assert_eq!(s.runes_index(utf16), runes, "utf16 {utf16}");
        }
        assert_eq!(s.utf16_index(-1), -1);
        assert_eq!(s.runes_index(-1), -1);
    }

    #[test]
    fn test_replace_inside_snippet() {
        let mut s = state_with_snippet(0, "hello world.");
        s.editor.selection.range = TextRange::new(12, 12);
        s.replace(TextRange::new(6, 11), "there!");
        assert_eq!(s.editor.snippet.text, "hello there!.");
        assert_eq!(s.editor.snippet.range, TextRange::new(0, 13));
        assert_eq!(s.editor.selection.range, TextRange::new(13, 13));
    }

    #[test]
    fn test_replace_collapses_positions_inside_range() {
        let mut s = state_with_snippet(0, "abcdef");
        s.editor.selection.range = TextRange::new(4, 5);
        s.compose = TextRange::new(1, 5);
        s.replace(TextRange::new(5, 1), "X");
        assert_eq!(s.editor.snippet.text, "aXf");
        assert_eq!(s.editor.selection.range, TextRange::new(2, 2));
        assert_eq!(s.compose, TextRange::new(1, 2));
    }

    #[test]
    fn test_replace_outside_snippet_discards_it() {
        let mut s = state_with_snippet(0, "abc");
        s.replace(TextRange::new(10, 12), "xyz");
        assert_eq!(s.editor.snippet.text, "xyz");
        assert_eq!(s.editor.snippet.range, TextRange::new(10, 13));
        assert_eq!(s.compose, TextRange::NONE);
    }

    #[test]
    fn test_snippets_consistent() {
        let old = Snippet {
            range: TextRange::new(0, 5),
            text: "hello".into(),
        };
        let shifted = Snippet {
            range: TextRange::new(2, 7),
            text: "llo, ".into(),
        };
        let changed = Snippet {
            range: TextRange::new(2, 7),
            text: "LLO, ".into(),
        };
        assert!(snippets_consistent(&old, &shifted));
        assert!(!snippets_consistent(&old, &changed));
    }

    proptest! {
        #[test]
        fn prop_index_round_trip(
            text in "\\PC{0,16}",
            start in 0i32..32,
            offset in 0i32..64,
        ) {
            let s = state_with_snippet(start, &text);
            prop_assert_eq!(s.runes_index(s.utf16_index(offset)), offset);
        }

        #[test]
        fn prop_replace_is_idempotent(
            text in "\\PC{0,16}",
            start in 0i32..16,
            a in 0i32..40,
            b in 0i32..40,
            replacement in "\\PC{0,8}",
            sel in 0i32..40,
        ) {
            let mut s = state_with_snippet(start, &text);
            s.editor.selection.range = TextRange::new(sel, sel);
            s.replace(TextRange::new(a, b), &replacement);
            let once = s.clone();
            let lo = a.min(b);
            let applied = TextRange::new(lo, lo + replacement.chars().count() as i32);
            s.replace(applied, &replacement);
            prop_assert_eq!(s, once);
        }
    }
}
