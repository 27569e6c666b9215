//! Scoped acquisition of a raw-mode session.

use std::ops::{Deref, DerefMut};

use sixterm_core::TerminalConfig;

use crate::sequences::SessionFeatures;
use crate::session::{SessionError, TerminalSession};

/// RAII guard that puts a session into raw mode and restores it on drop.
///
/// Dropping the guard (including during a panic unwind) turns every feature
/// off and leaves raw mode. Drop cannot report failure, so it logs at
/// `error`; call [`finish`](Self::finish) on the normal exit path to have a
/// restore failure propagate.
pub struct SessionGuard<S: TerminalSession> {
    session: S,
    finished: bool,
}

impl<S: TerminalSession> SessionGuard<S> {
    /// Enter raw mode and enable the features `config` asks for.
    ///
    /// If enabling features fails, the terminal is restored before the error
    /// is returned.
    pub fn enter(mut session: S, config: &TerminalConfig) -> Result<Self, SessionError> {
        session.enter_raw_mode()?;
        let mut guard = Self {
            session,
            finished: false,
        };
        guard.session.set_features(SessionFeatures {
            cursor_hidden: true,
            alternate_screen: config.alternate_screen,
            mouse_capture: config.mouse,
        })?;
        tracing::info!(platform = %guard.session.platform(), "terminal session started");
        Ok(guard)
    }

    /// Wrap a session that is already set up.
    pub fn adopt(session: S) -> Self {
        Self {
            session,
            finished: false,
        }
    }

    /// Restore the terminal, reporting any failure.
    pub fn finish(mut self) -> Result<(), SessionError> {
        self.finished = true;
        let result = self.session.shutdown();
        if result.is_ok() {
            tracing::info!(platform = %self.session.platform(), "terminal session restored");
        }
        result
    }
}

impl<S: TerminalSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: TerminalSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: TerminalSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(err) = self.session.shutdown() {
            tracing::error!(error = %err, "terminal restore failed during drop");
        }
    }
}
