#![forbid(unsafe_code)]

//! Raw byte input with bounded waits.
//!
//! [`ByteSource`] is the only thing [`InputDecoder`](crate::input_decoder::InputDecoder)
//! needs from a terminal: one byte at a time, never blocking past the given
//! timeout. Backends implement it over a tty fd or a console handle;
//! [`ScriptedInput`] implements it over an in-memory queue for tests and
//! headless sessions.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// A byte stream that can be read with a timeout.
pub trait ByteSource {
    /// Read one byte, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when nothing arrived in time. A zero timeout is a
    /// non-blocking check.
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        (**self).read_byte(timeout)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        (**self).read_byte(timeout)
    }
}

/// Granularity of the sleep loop while a [`ScriptedInput`] is empty.
const SCRIPTED_POLL_STEP: Duration = Duration::from_millis(1);

/// In-memory byte queue shared between clones.
///
/// Clones observe the same queue, so a test can keep one handle to
/// [`push`](Self::push) bytes while another is consumed by a decoder on a
/// different thread. Reads on an empty queue wait out the timeout in small
/// steps, so producers pushing concurrently are picked up.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    queue: Arc<Mutex<VecDeque<u8>>>,
}

impl ScriptedInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue pre-loaded with `bytes`.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let input = Self::new();
        input.push(bytes);
        input
    }

    /// Append bytes to the end of the queue.
    pub fn push(&self, bytes: &[u8]) {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.extend(bytes.iter().copied());
    }

    /// Number of bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn pop(&self) -> Option<u8> {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }
}

impl ByteSource for ScriptedInput {
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        if let Some(byte) = self.pop() {
            return Ok(Some(byte));
        }
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            thread::sleep(SCRIPTED_POLL_STEP.min(deadline - now));
            if let Some(byte) = self.pop() {
                return Ok(Some(byte));
            }
        }
    }
}
