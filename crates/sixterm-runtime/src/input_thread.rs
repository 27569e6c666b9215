//! Background input: one thread decodes, the render loop drains.
//!
//! The thread owns a cloned [`ByteSource`] and an [`InputDecoder`]. Each
//! decoded event goes into an unbounded channel in decode order; the render
//! loop drains it without blocking once per iteration. Reads time out
//! every `input_poll_interval`, which is when the thread checks for a stop
//! request. A read error ends the thread and is reported through
//! [`InputThread::check_error`].

use std::io;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use sixterm_core::{ByteSource, Event, InputDecoder, TerminalConfig};

use crate::stop::{StopHandle, StopToken, stop_pair};

/// Pause between checks while waiting for the thread to finish.
const JOIN_POLL: Duration = Duration::from_millis(1);

/// A running background input reader.
pub struct InputThread {
    events: mpsc::Receiver<Event>,
    error_rx: mpsc::Receiver<io::Error>,
    stop: StopHandle,
    handle: Option<JoinHandle<()>>,
    poll_interval: Duration,
    escape_timeout: Duration,
}

impl InputThread {
    /// Start reading from `source`.
    pub fn spawn(source: Box<dyn ByteSource + Send>, config: &TerminalConfig) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let (err_tx, err_rx) = mpsc::sync_channel(1);
        let (stop, token) = stop_pair();
        let decoder = InputDecoder::from_config(config);
        let poll_interval = config.input_poll_interval;
        let handle = thread::Builder::new()
            .name("sixterm-input".into())
            .spawn(move || {
                if let Err(err) = input_loop(source, decoder, &token, &tx, poll_interval) {
                    tracing::warn!(error = %err, "input thread stopped on read error");
                    let _ = err_tx.try_send(err);
                }
            })?;
        tracing::debug!(poll_interval = ?poll_interval, "input thread started");
        Ok(Self {
            events: rx,
            error_rx: err_rx,
            stop,
            handle: Some(handle),
            poll_interval,
            escape_timeout: config.escape_timeout,
        })
    }

    /// Next queued event, without blocking.
    #[must_use]
    pub fn try_next(&self) -> Option<Event> {
        self.events.try_recv().ok()
    }

    /// Every event queued so far, in decode order.
    pub fn drain(&self) -> impl Iterator<Item = Event> + '_ {
        self.events.try_iter()
    }

    /// Wait up to `timeout` for the next event.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Event> {
        self.events.recv_timeout(timeout).ok()
    }

    /// The error that ended the thread, if any.
    pub fn check_error(&self) -> Option<io::Error> {
        self.error_rx.try_recv().ok()
    }

    /// Whether the reader thread is still alive.
    ///
    /// It exits on a stop request, on a read error, or when the source
    /// reaches end of input.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop and join, waiting at most one read interval plus slack.
    ///
    /// Returns `true` if the thread was joined.
    pub fn stop(mut self) -> bool {
        let timeout = self.default_stop_timeout();
        self.stop_with_timeout(timeout)
    }

    /// Request a stop and wait up to `timeout` for the thread to exit.
    ///
    /// A thread still blocked when the timeout passes is detached; it exits
    /// on its next read timeout.
    pub fn stop_with_timeout(&mut self, timeout: Duration) -> bool {
        self.stop.stop();
        let Some(handle) = self.handle.take() else {
            return true;
        };
        let deadline = Instant::now() + timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                tracing::warn!(timeout = ?timeout, "input thread did not stop in time");
                return false;
            }
            thread::sleep(JOIN_POLL);
        }
        if handle.join().is_err() {
            tracing::warn!("input thread panicked");
        }
        true
    }

    /// One poll interval for the pending read, one escape timeout for a
    /// sequence in progress, and slack for scheduling.
    fn default_stop_timeout(&self) -> Duration {
        self.poll_interval + self.escape_timeout + Duration::from_millis(100)
    }
}

impl Drop for InputThread {
    fn drop(&mut self) {
        let timeout = self.default_stop_timeout();
        self.stop_with_timeout(timeout);
    }
}

fn input_loop(
    mut source: Box<dyn ByteSource + Send>,
    mut decoder: InputDecoder,
    stop: &StopToken,
    events: &mpsc::Sender<Event>,
    poll_interval: Duration,
) -> io::Result<()> {
    while !stop.is_stopped() {
        match decoder.next_event(&mut source, poll_interval) {
            Ok(Some(event)) => {
                if events.send(event).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                if stop.sleep(poll_interval) {
                    break;
                }
            }
            Err(err) => return Err(err),
        }
    }
    tracing::debug!("input thread exiting");
    Ok(())
}
