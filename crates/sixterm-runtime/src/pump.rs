//! Single-threaded input: short polls between renders.

use std::io;
use std::time::Duration;

use sixterm_backend::TerminalSession;
use sixterm_core::Event;

/// Per-poll wait when draining input cooperatively.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_millis(1);

/// Upper bound on events taken in one [`CooperativePump::pump`] call, so a
/// flood of input cannot starve rendering.
pub const DEFAULT_MAX_EVENTS: usize = 256;

/// Drains a session's input with short timeouts; no second thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooperativePump {
    step_timeout: Duration,
    max_events: usize,
}

impl Default for CooperativePump {
    fn default() -> Self {
        Self::new()
    }
}

impl CooperativePump {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            step_timeout: DEFAULT_STEP_TIMEOUT,
            max_events: DEFAULT_MAX_EVENTS,
        }
    }

    #[must_use]
    pub const fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// At least one event is always taken per call.
    #[must_use]
    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = max.max(1);
        self
    }

    #[must_use]
    pub const fn step_timeout(&self) -> Duration {
        self.step_timeout
    }

    /// Poll until input runs dry or the per-call limit is reached,
    /// appending events to `out` in decode order. Returns how many were
    /// added.
    pub fn pump<S: TerminalSession + ?Sized>(
        &self,
        session: &mut S,
        out: &mut Vec<Event>,
    ) -> io::Result<usize> {
        let start = out.len();
        while out.len() - start < self.max_events {
            match session.poll_event(self.step_timeout)? {
                Some(event) => out.push(event),
                None => break,
            }
        }
        Ok(out.len() - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sixterm_core::{Direction, KeyEvent, ScriptedInput};
    use sixterm_tty::HeadlessSession;
    use std::time::Instant;

    fn session(bytes: &[u8]) -> HeadlessSession {
        HeadlessSession::new(80, 24).with_input(ScriptedInput::from_bytes(bytes))
    }

    #[test]
    fn drains_everything_available() {
        let mut session = session(b"ab\x1b[C");
        let mut events = Vec::new();
        let n = CooperativePump::new().pump(&mut session, &mut events).unwrap();
        assert_eq!(n, 3);
        assert_eq!(events[2], Event::Key(KeyEvent::Arrow(Direction::Right)));
    }

    #[test]
    fn empty_input_returns_quickly() {
        let mut session = session(b"");
        let mut events = Vec::new();
        let start = Instant::now();
        let n = CooperativePump::new().pump(&mut session, &mut events).unwrap();
        assert_eq!(n, 0);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn respects_the_per_call_limit() {
        let mut session = session(b"abcdef");
        let pump = CooperativePump::new().with_max_events(4);
        let mut events = Vec::new();
        assert_eq!(pump.pump(&mut session, &mut events).unwrap(), 4);
        assert_eq!(pump.pump(&mut session, &mut events).unwrap(), 2);
        let chars: String = events
            .iter()
            .filter_map(|e| match e.as_key() {
                Some(KeyEvent::Char(c)) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(chars, "abcdef");
    }

    #[test]
    fn zero_limit_still_makes_progress() {
        let pump = CooperativePump::new().with_max_events(0);
        let mut session = session(b"x");
        let mut events = Vec::new();
        assert_eq!(pump.pump(&mut session, &mut events).unwrap(), 1);
    }
}
