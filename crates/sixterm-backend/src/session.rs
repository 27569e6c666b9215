//! The platform-neutral session interface.

use std::env;
use std::io;
use std::time::Duration;

use sixterm_core::{ByteSource, Event, Platform};

use crate::sequences::{self, SessionFeatures};

/// Errors from session lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("terminal I/O error: {0}")]
    Io(#[from] io::Error),
    /// Restoring the saved terminal state failed. The terminal may be left
    /// unusable; callers should terminate after best-effort cleanup.
    #[error("failed to restore terminal state: {0}")]
    Restore(#[source] io::Error),
    #[error("standard input is not a terminal")]
    NotATerminal,
    #[error("no terminal backend for this platform: {0}")]
    Unsupported(&'static str),
}

impl From<SessionError> for io::Error {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Io(err) => err,
            other => io::Error::other(other),
        }
    }
}

/// A raw-mode terminal session.
///
/// Lifecycle is `normal → raw → normal`. [`enter_raw_mode`] snapshots the
/// prior OS terminal state exactly once; [`exit_raw_mode`] restores and
/// discards it, and is a no-op when no snapshot exists. Feature toggles
/// are independent of raw mode and idempotent.
///
/// All terminal output goes through [`write`] and is only guaranteed to
/// reach the terminal after [`flush`].
///
/// [`enter_raw_mode`]: TerminalSession::enter_raw_mode
/// [`exit_raw_mode`]: TerminalSession::exit_raw_mode
/// [`write`]: TerminalSession::write
/// [`flush`]: TerminalSession::flush
pub trait TerminalSession: Send {
    fn platform(&self) -> Platform;

    /// Snapshot the current terminal state and switch to raw input.
    ///
    /// Calling it again while raw is a no-op.
    fn enter_raw_mode(&mut self) -> Result<(), SessionError>;

    /// Restore the snapshot taken by [`enter_raw_mode`](Self::enter_raw_mode).
    ///
    /// Fails with [`SessionError::Restore`] if the OS rejects the saved state.
    fn exit_raw_mode(&mut self) -> Result<(), SessionError>;

    fn is_raw(&self) -> bool;

    /// Current feature toggles.
    fn features(&self) -> SessionFeatures;

    /// Emit the sequences for the difference to `features` and flush.
    fn set_features(&mut self, features: SessionFeatures) -> io::Result<()>;

    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Terminal size as `(columns, rows)`.
    #[doc(alias = "get_size")]
    fn size(&self) -> io::Result<(u16, u16)>;

    /// Decode the next input event, waiting at most `timeout` for it to start.
    fn poll_event(&mut self, timeout: Duration) -> io::Result<Option<Event>>;

    /// An independent reader over the same input, for a background thread.
    ///
    /// Bytes the session has already buffered stay with the session.
    fn try_clone_input(&self) -> io::Result<Box<dyn ByteSource + Send>>;

    // ── Feature toggles ──────────────────────────────────────────────

    fn hide_cursor(&mut self) -> io::Result<()> {
        let features = SessionFeatures {
            cursor_hidden: true,
            ..self.features()
        };
        self.set_features(features)
    }

    fn show_cursor(&mut self) -> io::Result<()> {
        let features = SessionFeatures {
            cursor_hidden: false,
            ..self.features()
        };
        self.set_features(features)
    }

    fn enter_alt_screen(&mut self) -> io::Result<()> {
        let features = SessionFeatures {
            alternate_screen: true,
            ..self.features()
        };
        self.set_features(features)
    }

    fn exit_alt_screen(&mut self) -> io::Result<()> {
        let features = SessionFeatures {
            alternate_screen: false,
            ..self.features()
        };
        self.set_features(features)
    }

    fn enable_mouse(&mut self) -> io::Result<()> {
        let features = SessionFeatures {
            mouse_capture: true,
            ..self.features()
        };
        self.set_features(features)
    }

    fn disable_mouse(&mut self) -> io::Result<()> {
        let features = SessionFeatures {
            mouse_capture: false,
            ..self.features()
        };
        self.set_features(features)
    }

    // ── Cursor and screen ────────────────────────────────────────────

    /// Move to 1-indexed `(row, col)`.
    fn move_cursor(&mut self, row: u16, col: u16) -> io::Result<()> {
        let mut buf = Vec::with_capacity(12);
        sequences::write_cursor_position(row, col, &mut buf)?;
        self.write(&buf)?;
        self.flush()
    }

    fn move_cursor_home(&mut self) -> io::Result<()> {
        self.write(sequences::CURSOR_HOME)?;
        self.flush()
    }

    /// Clear the screen and home the cursor.
    fn clear_screen(&mut self) -> io::Result<()> {
        self.write(sequences::CLEAR_SCREEN)?;
        self.flush()
    }

    fn save_cursor(&mut self) -> io::Result<()> {
        self.write(sequences::CURSOR_SAVE)
    }

    fn restore_cursor(&mut self) -> io::Result<()> {
        self.write(sequences::CURSOR_RESTORE)
    }

    /// Turn every feature off, flush, then leave raw mode.
    ///
    /// Safe to call repeatedly and from cleanup paths. Raw mode is restored
    /// even when writing the feature sequences fails; the restore error
    /// takes precedence.
    fn shutdown(&mut self) -> Result<(), SessionError> {
        let features = self
            .set_features(SessionFeatures::NONE)
            .and_then(|()| self.flush());
        self.exit_raw_mode()?;
        features.map_err(SessionError::Io)
    }
}

impl<T: TerminalSession + ?Sized> TerminalSession for Box<T> {
    fn platform(&self) -> Platform {
        (**self).platform()
    }
    fn enter_raw_mode(&mut self) -> Result<(), SessionError> {
        (**self).enter_raw_mode()
    }
    fn exit_raw_mode(&mut self) -> Result<(), SessionError> {
        (**self).exit_raw_mode()
    }
    fn is_raw(&self) -> bool {
        (**self).is_raw()
    }
    fn features(&self) -> SessionFeatures {
        (**self).features()
    }
    fn set_features(&mut self, features: SessionFeatures) -> io::Result<()> {
        (**self).set_features(features)
    }
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }
    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
    fn size(&self) -> io::Result<(u16, u16)> {
        (**self).size()
    }
    fn poll_event(&mut self, timeout: Duration) -> io::Result<Option<Event>> {
        (**self).poll_event(timeout)
    }
    fn try_clone_input(&self) -> io::Result<Box<dyn ByteSource + Send>> {
        (**self).try_clone_input()
    }
    fn shutdown(&mut self) -> Result<(), SessionError> {
        (**self).shutdown()
    }
}

/// Fallback size used when the OS query fails.
pub const DEFAULT_SIZE: (u16, u16) = (80, 24);

/// `(COLUMNS, LINES)` from the environment, if both are set and sane.
#[must_use]
pub fn size_from_env() -> Option<(u16, u16)> {
    let cols = env::var("COLUMNS").ok()?.parse::<u16>().ok()?;
    let rows = env::var("LINES").ok()?.parse::<u16>().ok()?;
    if cols > 1 && rows > 1 {
        Some((cols, rows))
    } else {
        None
    }
}

/// Log a feature transition at `info`.
pub fn log_feature_change(platform: Platform, old: SessionFeatures, new: SessionFeatures) {
    if old != new {
        tracing::info!(
            %platform,
            cursor_hidden = new.cursor_hidden,
            alternate_screen = new.alternate_screen,
            mouse_capture = new.mouse_capture,
            "terminal features changed"
        );
    }
}
