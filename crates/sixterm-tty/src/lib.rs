#![deny(unsafe_code)]
//! Native terminal backends for sixterm.
//!
//! [`open_session`] picks the backend for the target at compile time:
//! termios over `/dev/tty` on Unix and macOS, console modes on Windows.
//! Both speak the same escape-sequence vocabulary, so everything above the
//! [`TerminalSession`] trait is platform-neutral. [`HeadlessSession`] runs
//! the same contract over in-memory buffers for tests.
//!
//! ## Escape Sequence Reference
//!
//! | Feature           | Enable                     | Disable                    |
//! |-------------------|----------------------------|----------------------------|
//! | Alternate screen  | `CSI ? 1049 h`             | `CSI ? 1049 l`             |
//! | Mouse (SGR)       | `CSI ? 1000 h` `CSI ? 1006 h` | `CSI ? 1006 l` `CSI ? 1000 l` |
//! | Cursor show/hide  | `CSI ? 25 h`               | `CSI ? 25 l`               |
//! | Save/restore cursor | `CSI s`                  | `CSI u`                    |
//!
//! ## Cleanup paths
//!
//! Normal exit goes through [`TerminalSession::shutdown`] (or a
//! [`SessionGuard`](sixterm_backend::SessionGuard)). A panic runs the hook
//! from [`install_panic_hook`] and then the session's `Drop` during
//! unwinding. On Unix, SIGINT and SIGTERM received while raw mode is active
//! restore the terminal from a signal thread before the process exits.

use std::io::{self, Write};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

use sixterm_backend::{SessionError, SessionFeatures, TerminalSession};
use sixterm_core::TerminalConfig;

pub mod headless;
#[cfg(unix)]
pub mod unix;
mod utf16;
#[cfg(windows)]
#[allow(unsafe_code)]
pub mod windows;

pub use headless::{HeadlessOutput, HeadlessSession};
pub use sixterm_backend::write_cleanup_sequence;
#[cfg(unix)]
pub use unix::{TtyInput, UnixSession};
#[cfg(windows)]
pub use windows::{ConsoleInput, WindowsSession};

// ── Factory ──────────────────────────────────────────────────────────────

/// Open the native session for this platform.
///
/// The session starts in normal mode with every feature off; enter raw mode
/// through [`SessionGuard::enter`](sixterm_backend::SessionGuard::enter) or
/// [`TerminalSession::enter_raw_mode`].
pub fn open_session(config: &TerminalConfig) -> Result<Box<dyn TerminalSession>, SessionError> {
    #[cfg(unix)]
    {
        Ok(Box::new(UnixSession::open(config)?))
    }
    #[cfg(windows)]
    {
        Ok(Box::new(WindowsSession::open(config)?))
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = config;
        Err(SessionError::Unsupported("no console API on this target"))
    }
}

// ── Live feature tracking ────────────────────────────────────────────────

const CURSOR_BIT: u8 = 0b001;
const ALT_SCREEN_BIT: u8 = 0b010;
const MOUSE_BIT: u8 = 0b100;

/// Features currently enabled on the real terminal, for cleanup paths that
/// cannot reach the session (panic hook, signal thread).
static ACTIVE_FEATURES: AtomicU8 = AtomicU8::new(0);

pub(crate) fn record_active_features(features: SessionFeatures) {
    let mut bits = 0;
    if features.cursor_hidden {
        bits |= CURSOR_BIT;
    }
    if features.alternate_screen {
        bits |= ALT_SCREEN_BIT;
    }
    if features.mouse_capture {
        bits |= MOUSE_BIT;
    }
    ACTIVE_FEATURES.store(bits, Ordering::SeqCst);
}

fn active_features() -> SessionFeatures {
    let bits = ACTIVE_FEATURES.load(Ordering::SeqCst);
    SessionFeatures {
        cursor_hidden: bits & CURSOR_BIT != 0,
        alternate_screen: bits & ALT_SCREEN_BIT != 0,
        mouse_capture: bits & MOUSE_BIT != 0,
    }
}

// ── Panic hook ───────────────────────────────────────────────────────────

/// Install a panic hook that writes the cleanup sequence before the
/// previous hook prints the panic message.
///
/// Installed once per process; later calls do nothing. Raw mode itself is
/// restored by the session's `Drop` while the panic unwinds.
pub fn install_panic_hook() {
    static HOOK: OnceLock<()> = OnceLock::new();
    HOOK.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            best_effort_cleanup();
            previous(info);
        }));
    });
}

/// Best-effort cleanup for termination paths that skip `Drop`.
///
/// Call this before `std::process::exit` to leave the alternate screen and
/// show the cursor when destructors will not run.
pub fn best_effort_cleanup_for_exit() {
    best_effort_cleanup();
}

pub(crate) fn best_effort_cleanup() {
    let features = active_features();
    let mut stdout = io::stdout();
    let _ = write_cleanup_sequence(&features, &mut stdout);
    let _ = stdout.flush();
    record_active_features(SessionFeatures::NONE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_bits_roundtrip() {
        let features = SessionFeatures {
            cursor_hidden: true,
            alternate_screen: false,
            mouse_capture: true,
        };
        record_active_features(features);
        assert_eq!(active_features(), features);
        record_active_features(SessionFeatures::NONE);
        assert!(active_features().is_none());
    }

    #[test]
    fn panic_hook_installs_once() {
        install_panic_hook();
        install_panic_hook();
    }
}
