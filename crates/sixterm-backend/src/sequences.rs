//! VT escape sequences shared by every backend.
//!
//! Both backends speak the same vocabulary: the Windows backend switches the
//! console into virtual-terminal mode rather than using console APIs for
//! cursor or screen control.

use std::io::{self, Write};

pub const CURSOR_HIDE: &[u8] = b"\x1b[?25l";
pub const CURSOR_SHOW: &[u8] = b"\x1b[?25h";

pub const ALT_SCREEN_ENTER: &[u8] = b"\x1b[?1049h";
pub const ALT_SCREEN_LEAVE: &[u8] = b"\x1b[?1049l";

/// Basic press/release reporting plus the SGR extended encoding.
pub const MOUSE_ENABLE: &[u8] = b"\x1b[?1000h\x1b[?1006h";
/// Reverse order of [`MOUSE_ENABLE`].
pub const MOUSE_DISABLE: &[u8] = b"\x1b[?1006l\x1b[?1000l";

pub const CLEAR_SCREEN: &[u8] = b"\x1b[2J\x1b[H";
pub const CURSOR_HOME: &[u8] = b"\x1b[H";

pub const CURSOR_SAVE: &[u8] = b"\x1b[s";
pub const CURSOR_RESTORE: &[u8] = b"\x1b[u";

/// Terminal modes layered on top of raw mode.
///
/// Each toggle is independent and idempotent: backends track the current
/// value and only emit sequences for changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SessionFeatures {
    /// Cursor hidden (`CSI ? 25 l`).
    pub cursor_hidden: bool,
    /// Alternate screen buffer active (`CSI ? 1049 h`).
    pub alternate_screen: bool,
    /// SGR mouse reporting (`CSI ? 1000 h` + `CSI ? 1006 h`).
    pub mouse_capture: bool,
}

impl SessionFeatures {
    /// Everything off: the state a session must return to on exit.
    pub const NONE: Self = Self {
        cursor_hidden: false,
        alternate_screen: false,
        mouse_capture: false,
    };

    #[must_use]
    pub const fn is_none(&self) -> bool {
        !self.cursor_hidden && !self.alternate_screen && !self.mouse_capture
    }
}

/// Write the sequences needed to move from `current` to `new`.
///
/// Features being turned off are handled first (mouse, cursor, alternate
/// screen), then features being turned on in the reverse order, so the
/// alternate screen is always entered before and left after the modes
/// that live inside it.
pub fn write_feature_delta(
    current: &SessionFeatures,
    new: &SessionFeatures,
    writer: &mut impl Write,
) -> io::Result<()> {
    if current.mouse_capture && !new.mouse_capture {
        writer.write_all(MOUSE_DISABLE)?;
    }
    if current.cursor_hidden && !new.cursor_hidden {
        writer.write_all(CURSOR_SHOW)?;
    }
    if current.alternate_screen && !new.alternate_screen {
        writer.write_all(ALT_SCREEN_LEAVE)?;
    }

    if !current.alternate_screen && new.alternate_screen {
        writer.write_all(ALT_SCREEN_ENTER)?;
    }
    if !current.cursor_hidden && new.cursor_hidden {
        writer.write_all(CURSOR_HIDE)?;
    }
    if !current.mouse_capture && new.mouse_capture {
        writer.write_all(MOUSE_ENABLE)?;
    }
    Ok(())
}

/// Write the full cleanup sequence for `features`.
///
/// Unlike [`write_feature_delta`] this always shows the cursor, so it is
/// safe to emit from panic and signal paths that cannot trust tracked state.
pub fn write_cleanup_sequence(features: &SessionFeatures, writer: &mut impl Write) -> io::Result<()> {
    if features.mouse_capture {
        writer.write_all(MOUSE_DISABLE)?;
    }
    writer.write_all(CURSOR_SHOW)?;
    if features.alternate_screen {
        writer.write_all(ALT_SCREEN_LEAVE)?;
    }
    Ok(())
}

/// `CSI row ; col H`, 1-indexed.
pub fn write_cursor_position(row: u16, col: u16, writer: &mut impl Write) -> io::Result<()> {
    write!(writer, "\x1b[{row};{col}H")
}

/// `CSI n A`. Zero rows writes nothing.
pub fn write_cursor_up(rows: u16, writer: &mut impl Write) -> io::Result<()> {
    if rows == 0 {
        return Ok(());
    }
    write!(writer, "\x1b[{rows}A")
}
