//! Keyboard, text editing and focus events
//!
//! Exactly one key handler holds focus at a time. Key, edit, selection and
//! snippet events are routed to it by the [`KeyQueue`]; focus changes are
//! announced with a pair of [`FocusEvent`]s.

mod queue;

pub use queue::KeyQueue;

use bitflags::bitflags;
use glam::{Affine2, Vec2};

bitflags! {
    /// Modifier keys held during an input event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const CTRL    = 0b0_0001;
        /// The command key on macOS.
        const COMMAND = 0b0_0010;
        const SHIFT   = 0b0_0100;
        const ALT     = 0b0_1000;
        /// The Windows / Super key.
        const SUPER   = 0b1_0000;
    }
}

impl Modifiers {
    /// The platform's primary shortcut modifier.
    #[cfg(target_os = "macos")]
    pub const SHORTCUT: Modifiers = Modifiers::COMMAND;
    #[cfg(not(target_os = "macos"))]
    pub const SHORTCUT: Modifiers = Modifiers::CTRL;
}

/// Logical key identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyName {
    /// A printable key, reported in upper case for letters.
    Character(char),
    Enter,
    Return,
    Tab,
    Escape,
    Space,
    Backspace,
    Delete,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    PageUp,
    PageDown,
    /// Function key F1..F12.
    F(u8),
    /// Platform back button.
    Back,
}

/// Press or release of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyState {
    #[default]
    Press,
    Release,
}

/// A key press or release, delivered to the focused handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub name: KeyName,
    pub modifiers: Modifiers,
    pub state: KeyState,
}

impl KeyEvent {
    pub fn press(name: KeyName, modifiers: Modifiers) -> Self {
        Self {
            name,
            modifiers,
            state: KeyState::Press,
        }
    }

    pub fn release(name: KeyName, modifiers: Modifiers) -> Self {
        Self {
            name,
            modifiers,
            state: KeyState::Release,
        }
    }
}

/// Range of runes. `start` may be larger than `end` for backwards
/// selections; `-1` marks an absent range (e.g. no composition).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextRange {
    pub start: i32,
    pub end: i32,
}

impl TextRange {
    pub const NONE: TextRange = TextRange { start: -1, end: -1 };

    pub const fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// Range with `start <= end`.
    pub fn normalized(self) -> Self {
        if self.end < self.start {
            Self {
                start: self.end,
                end: self.start,
            }
        } else {
            self
        }
    }

    pub fn len(&self) -> i32 {
        let r = self.normalized();
        r.end - r.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether either endpoint of `other` falls inside this range.
    pub fn overlaps(self, other: TextRange) -> bool {
        let r1 = self.normalized();
        let r2 = other.normalized();
        (r1.start <= r2.start && r2.start < r1.end) || (r1.start <= r2.end && r2.end < r1.end)
    }
}

/// Replacement of a text range, typically from an IME.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct EditEvent {
    pub range: TextRange,
    pub text: String,
}

/// Focus gained or lost by a key handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FocusEvent {
    pub focus: bool,
}

/// The platform changed the selection of the focused editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SelectionEvent(pub TextRange);

/// The platform asks for the snippet to cover (at least) this range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SnippetEvent(pub TextRange);

/// Caret geometry of a selection, in the handler's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Caret {
    /// Position of the caret on the text baseline.
    pub pos: Vec2,
    pub ascent: f32,
    pub descent: f32,
}

/// Selection of the focused editor together with its caret and the
/// transform into window coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub range: TextRange,
    pub caret: Caret,
    pub transform: Affine2,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            range: TextRange::default(),
            caret: Caret::default(),
            transform: Affine2::IDENTITY,
        }
    }
}

/// Cached substring of the client's text, starting at rune offset
/// `range.start`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Snippet {
    pub range: TextRange,
    pub text: String,
}

impl Snippet {
    /// Text of the runes in `r`, clipped to the snippet.
    pub fn substring(&self, r: TextRange) -> String {
        let r = r.normalized();
        let mut start = self.range.start;
        let mut end = self.range.end;
        let mut text = self.text.as_str();
        while r.start > start && r.start < end {
            match text.chars().next() {
                Some(c) => text = &text[c.len_utf8()..],
                None => break,
            }
            start += 1;
        }
        while r.end < end && r.end > start {
            match text.chars().next_back() {
                Some(c) => text = &text[..text.len() - c.len_utf8()],
                None => break,
            }
            end -= 1;
        }
        text.to_owned()
    }
}

/// Text state of the focused editor as declared in the last frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditorState {
    pub selection: Selection,
    pub snippet: Snippet,
}

/// On-screen keyboard layout hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum InputHint {
    #[default]
    Any = 0,
    Text,
    Numeric,
    Email,
    Url,
    Telephone,
    Password,
}

impl InputHint {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Any,
            1 => Self::Text,
            2 => Self::Numeric,
            3 => Self::Email,
            4 => Self::Url,
            5 => Self::Telephone,
            6 => Self::Password,
            _ => return None,
        })
    }
}

/// Desired visibility of the on-screen keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextInputState {
    /// No change.
    #[default]
    Keep,
    Close,
    Open,
}

/// Direction of a focus move.
///
/// `Forward` and `Backward` walk handlers in declaration order. The
/// directional variants walk the row layout built from handler bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FocusDirection {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

impl FocusDirection {
    /// Focus move requested by a key press, if any. Unmodified arrows only
    /// count when `arrows` is set.
    pub fn from_key(e: &KeyEvent, arrows: bool) -> Option<Self> {
        if e.state != KeyState::Press {
            return None;
        }
        let plain = e.modifiers.is_empty();
        match e.name {
            KeyName::Tab if plain => Some(Self::Forward),
            KeyName::Tab if e.modifiers == Modifiers::SHIFT => Some(Self::Backward),
            KeyName::ArrowLeft if plain && arrows => Some(Self::Left),
            KeyName::ArrowRight if plain && arrows => Some(Self::Right),
            KeyName::ArrowUp if plain && arrows => Some(Self::Up),
            KeyName::ArrowDown if plain && arrows => Some(Self::Down),
            _ => None,
        }
    }
}

bitflags! {
    /// Navigation keys a key handler consumes itself. Unclaimed navigation
    /// presses move the focus instead of reaching the focused handler.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FocusKeys: u8 {
        /// Tab and Shift+Tab.
        const TAB    = 0b01;
        /// The four arrow keys.
        const ARROWS = 0b10;
    }
}

impl FocusKeys {
    /// The claim that covers `name`, empty for keys that never move focus.
    pub fn of(name: KeyName) -> Self {
        match name {
            KeyName::Tab => Self::TAB,
            KeyName::ArrowLeft | KeyName::ArrowRight | KeyName::ArrowUp | KeyName::ArrowDown => {
                Self::ARROWS
            }
            _ => Self::empty(),
        }
    }
}
