#![forbid(unsafe_code)]

//! Canonical input event types.
//!
//! Every decoded unit of terminal input becomes exactly one [`Event`]. Events
//! are plain immutable values; they derive `Clone`, `PartialEq` and `Eq` for
//! use in tests and pattern matching.
//!
//! # Design Notes
//!
//! - Mouse coordinates are 0-indexed (the SGR wire form is 1-indexed)
//! - Unrecognized sequences are never errors; they decode to
//!   [`SpecialKey::Unknown`] carrying the terminator byte when one was seen

use std::fmt;

/// Canonical input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// A keyboard event.
    Key(KeyEvent),

    /// A mouse event.
    Mouse(MouseEvent),
}

impl Event {
    /// Returns the key event, if this is one.
    #[must_use]
    pub const fn as_key(&self) -> Option<KeyEvent> {
        match self {
            Self::Key(key) => Some(*key),
            Self::Mouse(_) => None,
        }
    }

    /// Returns the mouse event, if this is one.
    #[must_use]
    pub const fn as_mouse(&self) -> Option<MouseEvent> {
        match self {
            Self::Mouse(mouse) => Some(*mouse),
            Self::Key(_) => None,
        }
    }
}

impl From<KeyEvent> for Event {
    fn from(key: KeyEvent) -> Self {
        Self::Key(key)
    }
}

impl From<MouseEvent> for Event {
    fn from(mouse: MouseEvent) -> Self {
        Self::Mouse(mouse)
    }
}

// ── Keyboard ──────────────────────────────────────────────────────────────

/// A decoded keyboard unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEvent {
    /// A printable (or otherwise unmapped) code point.
    Char(char),

    /// One of the four arrow keys.
    Arrow(Direction),

    /// A named control key.
    Special(SpecialKey),
}

impl KeyEvent {
    /// `q`, `Q`, or Ctrl-C: the keys every sample application quits on.
    #[must_use]
    pub const fn is_quit(&self) -> bool {
        matches!(
            self,
            Self::Char('q') | Self::Char('Q') | Self::Special(SpecialKey::CtrlC)
        )
    }

    /// Returns `true` for [`SpecialKey::Unknown`].
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Special(SpecialKey::Unknown(_)))
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(c) => write!(f, "{c}"),
            Self::Arrow(dir) => write!(f, "{dir}"),
            Self::Special(key) => write!(f, "{key}"),
        }
    }
}

/// Arrow key direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Maps the final byte of `CSI A..D` / `SS3 A..D`.
    #[must_use]
    pub const fn from_final_byte(byte: u8) -> Option<Self> {
        match byte {
            b'A' => Some(Self::Up),
            b'B' => Some(Self::Down),
            b'C' => Some(Self::Right),
            b'D' => Some(Self::Left),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

/// Named control keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialKey {
    CtrlC,
    Tab,
    ShiftTab,
    Backspace,
    Enter,
    Escape,
    /// An unrecognized or malformed sequence. Carries the terminating byte
    /// when the sequence was complete enough to have one.
    Unknown(Option<char>),
}

impl fmt::Display for SpecialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CtrlC => f.write_str("ctrl-c"),
            Self::Tab => f.write_str("tab"),
            Self::ShiftTab => f.write_str("shift-tab"),
            Self::Backspace => f.write_str("backspace"),
            Self::Enter => f.write_str("enter"),
            Self::Escape => f.write_str("escape"),
            Self::Unknown(Some(term)) => write!(f, "unknown-{term}"),
            Self::Unknown(None) => f.write_str("unknown"),
        }
    }
}

// ── Mouse ─────────────────────────────────────────────────────────────────

/// A decoded SGR mouse report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub button: MouseButton,
    /// 0-indexed column.
    pub x: u16,
    /// 0-indexed row.
    pub y: u16,
}

impl MouseEvent {
    #[must_use]
    pub const fn new(kind: MouseEventKind, button: MouseButton, x: u16, y: u16) -> Self {
        Self { kind, button, x, y }
    }

    #[must_use]
    pub const fn press(button: MouseButton, x: u16, y: u16) -> Self {
        Self::new(MouseEventKind::Press, button, x, y)
    }

    /// Release reports carry no button in the SGR form.
    #[must_use]
    pub const fn release(x: u16, y: u16) -> Self {
        Self::new(MouseEventKind::Release, MouseButton::None, x, y)
    }

    #[must_use]
    pub const fn moved(button: MouseButton, x: u16, y: u16) -> Self {
        Self::new(MouseEventKind::Move, button, x, y)
    }

    /// Position as `(x, y)`.
    #[must_use]
    pub const fn position(&self) -> (u16, u16) {
        (self.x, self.y)
    }

    #[must_use]
    pub const fn is_scroll(&self) -> bool {
        matches!(self.button, MouseButton::ScrollUp | MouseButton::ScrollDown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    Press,
    Release,
    Move,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    ScrollUp,
    ScrollDown,
    None,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_keys() {
        assert!(KeyEvent::Char('q').is_quit());
        assert!(KeyEvent::Char('Q').is_quit());
        assert!(KeyEvent::Special(SpecialKey::CtrlC).is_quit());
        assert!(!KeyEvent::Char('x').is_quit());
        assert!(!KeyEvent::Special(SpecialKey::Escape).is_quit());
    }

    #[test]
    fn special_key_names() {
        assert_eq!(SpecialKey::CtrlC.to_string(), "ctrl-c");
        assert_eq!(SpecialKey::ShiftTab.to_string(), "shift-tab");
        assert_eq!(SpecialKey::Unknown(Some('~')).to_string(), "unknown-~");
        assert_eq!(SpecialKey::Unknown(None).to_string(), "unknown");
    }

    #[test]
    fn release_has_no_button() {
        let ev = MouseEvent::release(3, 4);
        assert_eq!(ev.button, MouseButton::None);
        assert_eq!(ev.kind, MouseEventKind::Release);
        assert_eq!(ev.position(), (3, 4));
    }

    #[test]
    fn direction_final_bytes() {
        assert_eq!(Direction::from_final_byte(b'A'), Some(Direction::Up));
        assert_eq!(Direction::from_final_byte(b'B'), Some(Direction::Down));
        assert_eq!(Direction::from_final_byte(b'C'), Some(Direction::Right));
        assert_eq!(Direction::from_final_byte(b'D'), Some(Direction::Left));
        assert_eq!(Direction::from_final_byte(b'E'), None);
    }

    #[test]
    fn event_accessors() {
        let key = Event::from(KeyEvent::Arrow(Direction::Up));
        assert_eq!(key.as_key(), Some(KeyEvent::Arrow(Direction::Up)));
        assert!(key.as_mouse().is_none());
        let mouse = Event::from(MouseEvent::press(MouseButton::ScrollUp, 0, 0));
        assert!(mouse.as_mouse().is_some_and(|m| m.is_scroll()));
    }
}
