#![forbid(unsafe_code)]

//! Escape-sequence state machine for raw terminal input.
//!
//! [`InputDecoder::next_event`] decodes exactly one unit per call, starting
//! from the idle state every time:
//!
//! | State      | Input                  | Result                              |
//! |------------|------------------------|-------------------------------------|
//! | idle       | `0x03`                 | `Special(CtrlC)`                    |
//! | idle       | `0x09`                 | `Special(Tab)`                      |
//! | idle       | `0x7F`, `0x08`         | `Special(Backspace)`                |
//! | idle       | `\r`, `\n`             | `Special(Enter)`                    |
//! | idle       | UTF-8 lead byte        | `Char` (U+FFFD when malformed)      |
//! | idle       | `ESC`                  | → esc                               |
//! | esc        | timeout                | `Special(Escape)`                   |
//! | esc        | `[`                    | → csi                               |
//! | esc        | `O`                    | → ss3                               |
//! | ss3        | `A`..`D`               | `Arrow`                             |
//! | csi        | `A`..`D` / `Z`         | `Arrow` / `Special(ShiftTab)`       |
//! | csi        | `<Cb;Cx;Cy` + `M`/`m`  | `Mouse` press / release             |
//!
//! Anything else decodes to [`SpecialKey::Unknown`]. Every read inside a
//! sequence is bounded by the escape timeout, so a truncated sequence can
//! never stall the caller.

use std::char::REPLACEMENT_CHARACTER;
use std::io;
use std::time::Duration;

use crate::byte_source::ByteSource;
use crate::config::TerminalConfig;
use crate::event::{Direction, Event, KeyEvent, MouseButton, MouseEvent, SpecialKey};

/// Default wait for the byte following `ESC`.
pub const DEFAULT_ESCAPE_TIMEOUT: Duration = Duration::from_millis(50);

/// Longest CSI parameter run accepted before the sequence is abandoned.
const CSI_MAX_LEN: usize = 32;

const ESC: u8 = 0x1B;

/// Turns a byte stream into [`Event`]s.
///
/// The decoder holds at most one byte of lookahead: when `ESC` is followed by
/// a byte that does not start a sequence, `ESC` decodes to
/// [`SpecialKey::Escape`] and the byte is kept for the next call.
#[derive(Debug, Clone)]
pub struct InputDecoder {
    escape_timeout: Duration,
    pending: Option<u8>,
}

impl Default for InputDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_ESCAPE_TIMEOUT)
    }
}

impl InputDecoder {
    #[must_use]
    pub const fn new(escape_timeout: Duration) -> Self {
        Self {
            escape_timeout,
            pending: None,
        }
    }

    #[must_use]
    pub const fn from_config(config: &TerminalConfig) -> Self {
        Self::new(config.escape_timeout)
    }

    #[must_use]
    pub const fn escape_timeout(&self) -> Duration {
        self.escape_timeout
    }

    /// Whether a lookahead byte is buffered from the previous call.
    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Decode the next event, waiting at most `timeout` for its first byte.
    ///
    /// Returns `Ok(None)` when no byte arrived in time. Once a sequence has
    /// started, each further byte waits at most the escape timeout.
    pub fn next_event<S: ByteSource + ?Sized>(
        &mut self,
        src: &mut S,
        timeout: Duration,
    ) -> io::Result<Option<Event>> {
        let Some(byte) = self.read(src, timeout)? else {
            return Ok(None);
        };
        let event = match byte {
            0x03 => special(SpecialKey::CtrlC),
            0x09 => special(SpecialKey::Tab),
            0x7F | 0x08 => special(SpecialKey::Backspace),
            b'\r' | b'\n' => special(SpecialKey::Enter),
            ESC => self.decode_escape(src)?,
            0x80.. => Event::Key(KeyEvent::Char(self.decode_utf8(byte, src)?)),
            _ => Event::Key(KeyEvent::Char(char::from(byte))),
        };
        Ok(Some(event))
    }

    /// Iterate events until a read times out.
    ///
    /// Each `next()` is one [`next_event`](Self::next_event) call; dropping
    /// the iterator loses nothing but the pending lookahead, which stays in
    /// the decoder.
    pub fn events<'a, S: ByteSource + ?Sized>(
        &'a mut self,
        src: &'a mut S,
        timeout: Duration,
    ) -> Events<'a, S> {
        Events {
            decoder: self,
            src,
            timeout,
        }
    }

    fn read<S: ByteSource + ?Sized>(
        &mut self,
        src: &mut S,
        timeout: Duration,
    ) -> io::Result<Option<u8>> {
        if let Some(byte) = self.pending.take() {
            return Ok(Some(byte));
        }
        src.read_byte(timeout)
    }

    fn decode_escape<S: ByteSource + ?Sized>(&mut self, src: &mut S) -> io::Result<Event> {
        match self.read(src, self.escape_timeout)? {
            None => Ok(special(SpecialKey::Escape)),
            Some(b'[') => self.decode_csi(src),
            Some(b'O') => self.decode_ss3(src),
            Some(other) => {
                self.pending = Some(other);
                Ok(special(SpecialKey::Escape))
            }
        }
    }

    fn decode_ss3<S: ByteSource + ?Sized>(&mut self, src: &mut S) -> io::Result<Event> {
        let Some(byte) = self.read(src, self.escape_timeout)? else {
            return Ok(unknown("ss3 truncated", None));
        };
        Ok(match Direction::from_final_byte(byte) {
            Some(dir) => Event::Key(KeyEvent::Arrow(dir)),
            None => unknown("ss3 unrecognized", Some(byte)),
        })
    }

    fn decode_csi<S: ByteSource + ?Sized>(&mut self, src: &mut S) -> io::Result<Event> {
        let mut params = [0u8; CSI_MAX_LEN];
        let mut len = 0;
        loop {
            let Some(byte) = self.read(src, self.escape_timeout)? else {
                return Ok(unknown("csi truncated", None));
            };
            if byte == ESC {
                // A new sequence started before this one finished.
                self.pending = Some(byte);
                return Ok(unknown("csi interrupted", None));
            }
            if byte.is_ascii_alphabetic() || byte == b'~' {
                return Ok(finish_csi(&params[..len], byte));
            }
            if len == CSI_MAX_LEN {
                return Ok(unknown("csi too long", None));
            }
            params[len] = byte;
            len += 1;
        }
    }

    /// Reads the continuation bytes of a multi-byte UTF-8 character.
    fn decode_utf8<S: ByteSource + ?Sized>(&mut self, lead: u8, src: &mut S) -> io::Result<char> {
        let width = match lead {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return Ok(REPLACEMENT_CHARACTER),
        };
        let mut buf = [lead, 0, 0, 0];
        for slot in buf.iter_mut().take(width).skip(1) {
            match self.read(src, self.escape_timeout)? {
                Some(byte) if byte & 0xC0 == 0x80 => *slot = byte,
                Some(byte) => {
                    self.pending = Some(byte);
                    return Ok(REPLACEMENT_CHARACTER);
                }
                None => return Ok(REPLACEMENT_CHARACTER),
            }
        }
        Ok(std::str::from_utf8(&buf[..width])
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or(REPLACEMENT_CHARACTER))
    }
}

/// Iterator returned by [`InputDecoder::events`].
pub struct Events<'a, S: ByteSource + ?Sized> {
    decoder: &'a mut InputDecoder,
    src: &'a mut S,
    timeout: Duration,
}

impl<S: ByteSource + ?Sized> Iterator for Events<'_, S> {
    type Item = io::Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.next_event(self.src, self.timeout).transpose()
    }
}

fn special(key: SpecialKey) -> Event {
    Event::Key(KeyEvent::Special(key))
}

fn unknown(reason: &'static str, terminator: Option<u8>) -> Event {
    tracing::debug!(reason, terminator = ?terminator.map(char::from), "unrecognized input sequence");
    special(SpecialKey::Unknown(terminator.map(char::from)))
}

fn finish_csi(params: &[u8], terminator: u8) -> Event {
    if let Some(rest) = params.strip_prefix(b"<") {
        if matches!(terminator, b'M' | b'm') {
            if let Some(mouse) = parse_sgr_mouse(rest, terminator == b'm') {
                return Event::Mouse(mouse);
            }
        }
        return unknown("malformed sgr mouse report", Some(terminator));
    }
    if params.is_empty() {
        if let Some(dir) = Direction::from_final_byte(terminator) {
            return Event::Key(KeyEvent::Arrow(dir));
        }
        if terminator == b'Z' {
            return special(SpecialKey::ShiftTab);
        }
    }
    unknown("csi unrecognized", Some(terminator))
}

/// Parses the `Cb;Cx;Cy` body of an SGR mouse report.
///
/// Coordinates on the wire are 1-indexed; a zero coordinate is malformed.
fn parse_sgr_mouse(body: &[u8], release: bool) -> Option<MouseEvent> {
    let text = std::str::from_utf8(body).ok()?;
    let mut fields = text.split(';');
    let cb: u16 = fields.next()?.parse().ok()?;
    let cx: u16 = fields.next()?.parse().ok()?;
    let cy: u16 = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    let x = cx.checked_sub(1)?;
    let y = cy.checked_sub(1)?;

    if release {
        return Some(MouseEvent::release(x, y));
    }
    if cb >= 64 {
        match cb & 0x03 {
            0 => return Some(MouseEvent::press(MouseButton::ScrollUp, x, y)),
            1 => return Some(MouseEvent::press(MouseButton::ScrollDown, x, y)),
            _ => {}
        }
    }
    let button = match cb & 0x03 {
        0 => MouseButton::Left,
        1 => MouseButton::Middle,
        2 => MouseButton::Right,
        _ => MouseButton::None,
    };
    Some(MouseEvent::press(button, x, y))
}
