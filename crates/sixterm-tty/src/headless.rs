//! In-memory session for tests and offscreen runs.
//!
//! [`HeadlessSession`] honors the full [`TerminalSession`] contract (raw
//! mode transitions, idempotent feature toggles, write-then-flush) without
//! touching a terminal. Input comes from a [`ScriptedInput`]; output is
//! captured in a [`HeadlessOutput`] that stays readable after the session
//! has been moved into a guard or an app loop.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use sixterm_backend::{
    DEFAULT_SIZE, SessionError, SessionFeatures, TerminalSession, write_feature_delta,
};
use sixterm_core::{ByteSource, Event, InputDecoder, Platform, ScriptedInput, TerminalConfig};

#[derive(Debug, Default)]
struct Captured {
    /// Bytes written and flushed.
    flushed: Vec<u8>,
    /// Bytes written since the last flush.
    buffered: Vec<u8>,
    flushes: usize,
    raw_entries: usize,
    raw_exits: usize,
}

/// Shared view of everything a [`HeadlessSession`] wrote.
#[derive(Debug, Clone, Default)]
pub struct HeadlessOutput {
    inner: Arc<Mutex<Captured>>,
}

impl HeadlessOutput {
    fn lock(&self) -> MutexGuard<'_, Captured> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Bytes that reached the "terminal" (flushed).
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        self.lock().flushed.clone()
    }

    /// Take the flushed bytes, leaving the buffer empty.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().flushed)
    }

    /// Bytes written but not yet flushed.
    #[must_use]
    pub fn unflushed(&self) -> Vec<u8> {
        self.lock().buffered.clone()
    }

    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.lock().flushes
    }

    /// `(entries, exits)` of raw mode so far.
    #[must_use]
    pub fn raw_transitions(&self) -> (usize, usize) {
        let captured = self.lock();
        (captured.raw_entries, captured.raw_exits)
    }
}

/// A terminal session backed by memory.
#[derive(Debug)]
pub struct HeadlessSession {
    input: ScriptedInput,
    decoder: InputDecoder,
    output: HeadlessOutput,
    features: SessionFeatures,
    raw: bool,
    size: (u16, u16),
    platform: Platform,
}

impl HeadlessSession {
    /// A session of the given size with empty input.
    #[must_use]
    pub fn new(cols: u16, rows: u16) -> Self {
        Self::with_config(cols, rows, &TerminalConfig::default())
    }

    #[must_use]
    pub fn with_config(cols: u16, rows: u16, config: &TerminalConfig) -> Self {
        Self {
            input: ScriptedInput::new(),
            decoder: InputDecoder::from_config(config),
            output: HeadlessOutput::default(),
            features: SessionFeatures::NONE,
            raw: false,
            size: (cols, rows),
            platform: Platform::current(),
        }
    }

    /// Replace the input queue.
    #[must_use]
    pub fn with_input(mut self, input: ScriptedInput) -> Self {
        self.input = input;
        self
    }

    /// Handle to the input queue; bytes pushed here are seen by
    /// [`poll_event`](TerminalSession::poll_event) and by cloned readers.
    #[must_use]
    pub fn input(&self) -> ScriptedInput {
        self.input.clone()
    }

    /// Handle to the captured output.
    #[must_use]
    pub fn output(&self) -> HeadlessOutput {
        self.output.clone()
    }

    /// Flushed bytes so far.
    #[must_use]
    pub fn written(&self) -> Vec<u8> {
        self.output.bytes()
    }

    pub fn set_size(&mut self, cols: u16, rows: u16) {
        self.size = (cols, rows);
    }
}

impl Default for HeadlessSession {
    fn default() -> Self {
        Self::new(DEFAULT_SIZE.0, DEFAULT_SIZE.1)
    }
}

impl TerminalSession for HeadlessSession {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn enter_raw_mode(&mut self) -> Result<(), SessionError> {
        if !self.raw {
            self.raw = true;
            self.output.lock().raw_entries += 1;
        }
        Ok(())
    }

    fn exit_raw_mode(&mut self) -> Result<(), SessionError> {
        if self.raw {
            self.raw = false;
            self.output.lock().raw_exits += 1;
        }
        Ok(())
    }

    fn is_raw(&self) -> bool {
        self.raw
    }

    fn features(&self) -> SessionFeatures {
        self.features
    }

    fn set_features(&mut self, features: SessionFeatures) -> io::Result<()> {
        let mut buf = Vec::new();
        write_feature_delta(&self.features, &features, &mut buf)?;
        self.features = features;
        if !buf.is_empty() {
            self.write(&buf)?;
            self.flush()?;
        }
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.output.lock().buffered.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut captured = self.output.lock();
        let pending = std::mem::take(&mut captured.buffered);
        captured.flushed.extend_from_slice(&pending);
        captured.flushes += 1;
        Ok(())
    }

    fn size(&self) -> io::Result<(u16, u16)> {
        Ok(self.size)
    }

    fn poll_event(&mut self, timeout: Duration) -> io::Result<Option<Event>> {
        self.decoder.next_event(&mut self.input, timeout)
    }

    fn try_clone_input(&self) -> io::Result<Box<dyn ByteSource + Send>> {
        Ok(Box::new(self.input.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sixterm_backend::sequences;
    use sixterm_backend::SessionGuard;
    use sixterm_core::{Direction, KeyEvent};
    use std::time::Instant;

    #[test]
    fn writes_are_invisible_until_flush() {
        let mut session = HeadlessSession::new(80, 24);
        session.write(b"frame").unwrap();
        assert!(session.written().is_empty());
        assert_eq!(session.output().unflushed(), b"frame");
        session.flush().unwrap();
        assert_eq!(session.written(), b"frame");
        assert_eq!(session.output().flush_count(), 1);
    }

    #[test]
    fn exit_before_enter_is_noop() {
        let mut session = HeadlessSession::default();
        session.exit_raw_mode().unwrap();
        session.exit_raw_mode().unwrap();
        assert_eq!(session.output().raw_transitions(), (0, 0));
    }

    #[test]
    fn double_exit_restores_once() {
        let mut session = HeadlessSession::default();
        session.enter_raw_mode().unwrap();
        session.enter_raw_mode().unwrap();
        session.exit_raw_mode().unwrap();
        session.exit_raw_mode().unwrap();
        assert_eq!(session.output().raw_transitions(), (1, 1));
        assert!(!session.is_raw());
    }

    #[test]
    fn reports_configured_size() {
        let mut session = HeadlessSession::new(132, 43);
        assert_eq!(session.size().unwrap(), (132, 43));
        session.set_size(40, 10);
        assert_eq!(session.size().unwrap(), (40, 10));
    }

    #[test]
    fn poll_decodes_scripted_input() {
        let session = HeadlessSession::default();
        let input = session.input();
        let mut session = session;
        input.push(b"\x1bOA");
        let event = session.poll_event(Duration::from_millis(10)).unwrap();
        assert_eq!(event, Some(Event::Key(KeyEvent::Arrow(Direction::Up))));
    }

    #[test]
    fn poll_without_input_respects_timeout() {
        let mut session = HeadlessSession::default();
        let timeout = Duration::from_millis(20);
        let start = Instant::now();
        assert_eq!(session.poll_event(timeout).unwrap(), None);
        let elapsed = start.elapsed();
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + Duration::from_millis(250));
    }

    #[test]
    fn guard_leaves_terminal_clean() {
        let session = HeadlessSession::default();
        let output = session.output();
        let config = TerminalConfig {
            alternate_screen: true,
            ..TerminalConfig::default()
        };
        {
            let mut guard = SessionGuard::enter(session, &config).unwrap();
            guard.write(b"payload").unwrap();
            guard.flush().unwrap();
        }
        let bytes = output.bytes();
        assert!(bytes.starts_with(sequences::ALT_SCREEN_ENTER));
        assert!(bytes.ends_with(sequences::ALT_SCREEN_LEAVE));
        assert_eq!(output.raw_transitions(), (1, 1));
    }
}
