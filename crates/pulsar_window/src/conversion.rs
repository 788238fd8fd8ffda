//! Input Conversion Utilities
//!
//! Converts winit input into Pulsar input events and Pulsar cursor and
//! action requests back into winit types, for drivers built on winit.
//!
//! ## Conversion Functions
//! - Mouse button and modifier conversion (winit → Pulsar)
//! - KeyCode to [`KeyName`] mapping
//! - Cursor and resize action conversion (Pulsar → winit)
//! - [`InputTranslator`], which tracks pointer state across window events

use glam::Vec2;
use pulsar_input::keyboard::{KeyEvent, KeyName, KeyState, Modifiers};
use pulsar_input::pointer::{Buttons, Cursor, PointerEvent, PointerKind, Source};
use pulsar_input::{Action, Event};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};
use winit::window::{CursorIcon, ResizeDirection};

/// Pixels scrolled per wheel line.
const LINE_HEIGHT: f32 = 40.0;

// ============================================================================
// Extension Traits for Type Conversion
// ============================================================================

/// Extension trait for converting winit modifiers to Pulsar modifiers.
pub trait ToPulsarModifiers {
    fn to_pulsar(&self) -> Modifiers;
}

impl ToPulsarModifiers for ModifiersState {
    fn to_pulsar(&self) -> Modifiers {
        let mut m = Modifiers::empty();
        m.set(Modifiers::CTRL, self.control_key());
        m.set(Modifiers::ALT, self.alt_key());
        m.set(Modifiers::SHIFT, self.shift_key());
        // The super key is the command key on macOS.
        if cfg!(target_os = "macos") {
            m.set(Modifiers::COMMAND, self.super_key());
        } else {
            m.set(Modifiers::SUPER, self.super_key());
        }
        m
    }
}

/// Extension trait for converting a winit mouse button to Pulsar buttons.
pub trait ToPulsarButtons {
    fn to_pulsar(self) -> Buttons;
}

impl ToPulsarButtons for MouseButton {
    fn to_pulsar(self) -> Buttons {
        match self {
            MouseButton::Left => Buttons::PRIMARY,
            MouseButton::Right => Buttons::SECONDARY,
            MouseButton::Middle => Buttons::TERTIARY,
            MouseButton::Back | MouseButton::Forward | MouseButton::Other(_) => Buttons::empty(),
        }
    }
}

/// Extension trait for converting a Pulsar cursor to a winit cursor icon.
pub trait ToWinitCursor {
    /// `None` hides the cursor.
    fn to_winit(self) -> Option<CursorIcon>;
}

impl ToWinitCursor for Cursor {
    fn to_winit(self) -> Option<CursorIcon> {
        Some(match self {
            Cursor::Default => CursorIcon::Default,
            Cursor::None => return None,
            Cursor::Text => CursorIcon::Text,
            Cursor::VerticalText => CursorIcon::VerticalText,
            Cursor::Pointer => CursorIcon::Pointer,
            Cursor::Crosshair => CursorIcon::Crosshair,
            Cursor::AllScroll => CursorIcon::AllScroll,
            Cursor::ColResize => CursorIcon::ColResize,
            Cursor::RowResize => CursorIcon::RowResize,
            Cursor::Grab => CursorIcon::Grab,
            Cursor::Grabbing => CursorIcon::Grabbing,
            Cursor::NotAllowed => CursorIcon::NotAllowed,
            Cursor::Wait => CursorIcon::Wait,
            Cursor::Progress => CursorIcon::Progress,
            Cursor::NorthWestResize => CursorIcon::NwResize,
            Cursor::NorthEastResize => CursorIcon::NeResize,
            Cursor::SouthWestResize => CursorIcon::SwResize,
            Cursor::SouthEastResize => CursorIcon::SeResize,
            Cursor::NorthSouthResize => CursorIcon::NsResize,
            Cursor::EastWestResize => CursorIcon::EwResize,
            Cursor::WestResize => CursorIcon::WResize,
            Cursor::EastResize => CursorIcon::EResize,
            Cursor::NorthResize => CursorIcon::NResize,
            Cursor::SouthResize => CursorIcon::SResize,
        })
    }
}

/// Direction of an interactive resize action, for
/// `winit::window::Window::drag_resize_window`.
pub fn resize_direction(action: Action) -> Option<ResizeDirection> {
    let dirs = [
        (Action::RESIZE_NORTH_WEST, ResizeDirection::NorthWest),
        (Action::RESIZE_NORTH_EAST, ResizeDirection::NorthEast),
        (Action::RESIZE_SOUTH_WEST, ResizeDirection::SouthWest),
        (Action::RESIZE_SOUTH_EAST, ResizeDirection::SouthEast),
        (Action::RESIZE_NORTH, ResizeDirection::North),
        (Action::RESIZE_SOUTH, ResizeDirection::South),
        (Action::RESIZE_WEST, ResizeDirection::West),
        (Action::RESIZE_EAST, ResizeDirection::East),
    ];
    dirs.into_iter()
        .find(|(a, _)| action.contains(*a))
        .map(|(_, d)| d)
}

// ============================================================================
// KeyCode to KeyName Conversion
// ============================================================================

/// Map a physical key to its Pulsar name. Letters map to upper case
/// characters. Returns `None` for keys Pulsar does not name.
pub fn keycode_to_key_name(code: KeyCode) -> Option<KeyName> {
    use KeyCode::*;
    let c = match code {
        KeyA => 'A',
        KeyB => 'B',
        KeyC => 'C',
        KeyD => 'D',
        KeyE => 'E',
        KeyF => 'F',
        KeyG => 'G',
        KeyH => 'H',
        KeyI => 'I',
        KeyJ => 'J',
        KeyK => 'K',
        KeyL => 'L',
        KeyM => 'M',
        KeyN => 'N',
        KeyO => 'O',
        KeyP => 'P',
        KeyQ => 'Q',
        KeyR => 'R',
        KeyS => 'S',
        KeyT => 'T',
        KeyU => 'U',
        KeyV => 'V',
        KeyW => 'W',
        KeyX => 'X',
        KeyY => 'Y',
        KeyZ => 'Z',

        Digit0 => '0',
        Digit1 => '1',
        Digit2 => '2',
        Digit3 => '3',
        Digit4 => '4',
        Digit5 => '5',
        Digit6 => '6',
        Digit7 => '7',
        Digit8 => '8',
        Digit9 => '9',

        Minus => '-',
        Equal => '=',
        BracketLeft => '[',
        BracketRight => ']',
        Backslash => '\\',
        Semicolon => ';',
        Quote => '\'',
        Comma => ',',
        Period => '.',
        Slash => '/',
        Backquote => '`',

        _ => {
            return Some(match code {
                Enter => KeyName::Return,
                NumpadEnter => KeyName::Enter,
                Tab => KeyName::Tab,
                Escape => KeyName::Escape,
                Space => KeyName::Space,
                Backspace => KeyName::Backspace,
                Delete => KeyName::Delete,
                ArrowLeft => KeyName::ArrowLeft,
                ArrowRight => KeyName::ArrowRight,
                ArrowUp => KeyName::ArrowUp,
                ArrowDown => KeyName::ArrowDown,
                Home => KeyName::Home,
                End => KeyName::End,
                PageUp => KeyName::PageUp,
                PageDown => KeyName::PageDown,
                BrowserBack => KeyName::Back,
                F1 => KeyName::F(1),
                F2 => KeyName::F(2),
                F3 => KeyName::F(3),
                F4 => KeyName::F(4),
                F5 => KeyName::F(5),
                F6 => KeyName::F(6),
                F7 => KeyName::F(7),
                F8 => KeyName::F(8),
                F9 => KeyName::F(9),
                F10 => KeyName::F(10),
                F11 => KeyName::F(11),
                F12 => KeyName::F(12),
                _ => return None,
            })
        }
    };
    Some(KeyName::Character(c))
}

// ============================================================================
// Event Translation
// ============================================================================

/// Turns winit window events into Pulsar input events. Keeps the pointer
/// position, pressed buttons and modifiers winit reports separately.
#[derive(Debug, Default)]
pub struct InputTranslator {
    position: Vec2,
    buttons: Buttons,
    modifiers: Modifiers,
}

impl InputTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate `event`. Events that only update tracked state, and events
    /// that are not input, return `None`.
    pub fn translate(&mut self, event: &WindowEvent) -> Option<Event> {
        match event {
            WindowEvent::ModifiersChanged(m) => {
                self.modifiers = m.state().to_pulsar();
                None
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.position = Vec2::new(position.x as f32, position.y as f32);
                Some(self.pointer(PointerKind::MOVE).into())
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let b = button.to_pulsar();
                let kind = match state {
                    ElementState::Pressed => {
                        self.buttons |= b;
                        PointerKind::PRESS
                    }
                    ElementState::Released => {
                        self.buttons.remove(b);
                        PointerKind::RELEASE
                    }
                };
                Some(self.pointer(kind).into())
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(x, y) => Vec2::new(-x, -y) * LINE_HEIGHT,
                    MouseScrollDelta::PixelDelta(p) => Vec2::new(-p.x as f32, -p.y as f32),
                };
                Some(self.pointer(PointerKind::SCROLL).with_scroll(scroll).into())
            }
            WindowEvent::Touch(touch) => {
                let kind = match touch.phase {
                    TouchPhase::Started => PointerKind::PRESS,
                    TouchPhase::Moved => PointerKind::MOVE,
                    TouchPhase::Ended => PointerKind::RELEASE,
                    TouchPhase::Cancelled => PointerKind::CANCEL,
                };
                let position = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                let e = PointerEvent::new(kind, position)
                    .with_source(Source::Touch)
                    .with_pointer_id(touch.id as u32);
                Some(PointerEvent {
                    modifiers: self.modifiers,
                    ..e
                }
                .into())
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return None;
                };
                let name = keycode_to_key_name(code)?;
                let e = match event.state {
                    ElementState::Pressed => KeyEvent::press(name, self.modifiers),
                    ElementState::Released => KeyEvent::release(name, self.modifiers),
                };
                Some(e.into())
            }
            _ => None,
        }
    }

    fn pointer(&self, kind: PointerKind) -> PointerEvent {
        PointerEvent {
            modifiers: self.modifiers,
            ..PointerEvent::new(kind, self.position).with_buttons(self.buttons)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers() {
        let m = (ModifiersState::CONTROL | ModifiersState::SHIFT).to_pulsar();
        assert_eq!(m, Modifiers::CTRL | Modifiers::SHIFT);
    }

    #[test]
    fn test_key_names() {
        assert_eq!(keycode_to_key_name(KeyCode::KeyQ), Some(KeyName::Character('Q')));
        assert_eq!(keycode_to_key_name(KeyCode::Tab), Some(KeyName::Tab));
        assert_eq!(keycode_to_key_name(KeyCode::F11), Some(KeyName::F(11)));
        assert_eq!(keycode_to_key_name(KeyCode::CapsLock), None);
    }

    #[test]
    fn test_buttons() {
        assert_eq!(MouseButton::Left.to_pulsar(), Buttons::PRIMARY);
        assert_eq!(MouseButton::Other(7).to_pulsar(), Buttons::empty());
    }

    #[test]
    fn test_cursor_and_resize() {
        assert_eq!(Cursor::None.to_winit(), None);
        assert_eq!(Cursor::NorthWestResize.to_winit(), Some(CursorIcon::NwResize));
        assert_eq!(
            resize_direction(Action::RESIZE_SOUTH_EAST),
            Some(ResizeDirection::SouthEast)
        );
        assert_eq!(resize_direction(Action::CLOSE), None);
    }
}
