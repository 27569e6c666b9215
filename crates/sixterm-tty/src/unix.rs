//! Unix backend: termios raw mode on `/dev/tty`.
//!
//! Input is read from the controlling terminal with `poll(2)` so every read
//! honors its timeout. Escape sequences go to stdout, which is where the
//! frames go too.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::AsFd;
use std::thread;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::termios::{self, SetArg, Termios};
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use sixterm_backend::session::log_feature_change;
use sixterm_backend::{
    DEFAULT_SIZE, SessionError, SessionFeatures, TerminalSession, size_from_env,
    write_feature_delta,
};
use sixterm_core::{ByteSource, Event, InputDecoder, Platform, TerminalConfig};

const READ_CHUNK: usize = 1024;

// ── Input ────────────────────────────────────────────────────────────────

/// Timed byte reader over a terminal file descriptor.
///
/// Reads in chunks and hands bytes out one at a time. End of file is an
/// error: a closed terminal will never produce input again.
#[derive(Debug)]
pub struct TtyInput {
    file: File,
    buffered: VecDeque<u8>,
}

impl TtyInput {
    #[must_use]
    pub fn new(file: File) -> Self {
        Self {
            file,
            buffered: VecDeque::with_capacity(READ_CHUNK),
        }
    }

    /// Another reader on the same descriptor, with an empty buffer.
    pub fn try_clone(&self) -> io::Result<Self> {
        Ok(Self::new(self.file.try_clone()?))
    }

    /// Wait up to `timeout` for the descriptor to become readable.
    fn poll_readable(&self, timeout: Duration) -> io::Result<bool> {
        let mut poll_fds = [nix::poll::PollFd::new(
            self.file.as_fd(),
            nix::poll::PollFlags::POLLIN,
        )];
        let timeout_ms: u16 = timeout.as_millis().try_into().unwrap_or(u16::MAX);
        match nix::poll::poll(&mut poll_fds, nix::poll::PollTimeout::from(timeout_ms)) {
            Ok(n) => Ok(n > 0),
            Err(Errno::EINTR) => Ok(false),
            Err(e) => Err(io::Error::from(e)),
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        match self.file.read(&mut chunk) {
            Ok(0) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "terminal input closed",
            )),
            Ok(n) => {
                self.buffered.extend(&chunk[..n]);
                Ok(())
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl ByteSource for TtyInput {
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        if let Some(byte) = self.buffered.pop_front() {
            return Ok(Some(byte));
        }
        if self.poll_readable(timeout)? {
            self.fill()?;
        }
        Ok(self.buffered.pop_front())
    }
}

// ── Signals ──────────────────────────────────────────────────────────────

// SIGINT/SIGTERM are handled on a dedicated signal-hook thread; raw
// `sigaction` would need unsafe code.
#[derive(Debug)]
struct SignalGuard {
    handle: signal_hook::iterator::Handle,
    thread: Option<thread::JoinHandle<()>>,
}

impl SignalGuard {
    /// Restore `original` on `tty` and exit if a termination signal arrives.
    fn install(tty: File, original: Termios) -> io::Result<Self> {
        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        let handle = signals.handle();
        let thread = thread::Builder::new()
            .name("sixterm-signals".into())
            .spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    tracing::warn!(signal, "termination signal received, restoring terminal");
                    crate::best_effort_cleanup();
                    let _ = termios::tcsetattr(&tty, SetArg::TCSADRAIN, &original);
                    std::process::exit(128 + signal);
                }
            })?;
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

// ── Session ──────────────────────────────────────────────────────────────

/// Terminal session on the controlling terminal of a Unix process.
pub struct UnixSession {
    tty: File,
    input: TtyInput,
    decoder: InputDecoder,
    features: SessionFeatures,
    /// Termios captured by `enter_raw_mode`; `Some` exactly while raw.
    saved: Option<Termios>,
    signal_guard: Option<SignalGuard>,
    out: Box<dyn Write + Send>,
    /// True when `out` is the process stdout and `tty` the controlling
    /// terminal; only then do the process-wide cleanup hooks apply.
    live: bool,
}

impl UnixSession {
    /// Open `/dev/tty` for input and stdout for output.
    pub fn open(config: &TerminalConfig) -> Result<Self, SessionError> {
        let tty = File::options()
            .read(true)
            .write(true)
            .open("/dev/tty")
            .map_err(|err| {
                tracing::debug!(error = %err, "no controlling terminal");
                SessionError::NotATerminal
            })?;
        let mut session = Self::with_tty(tty, Box::new(io::stdout()), config)?;
        session.live = true;
        Ok(session)
    }

    /// Build a session over an arbitrary terminal descriptor and writer.
    ///
    /// Process-wide cleanup (panic hook, signal thread) is not armed for
    /// sessions built this way.
    pub fn with_tty(
        tty: File,
        out: Box<dyn Write + Send>,
        config: &TerminalConfig,
    ) -> io::Result<Self> {
        let input = TtyInput::new(tty.try_clone()?);
        Ok(Self {
            tty,
            input,
            decoder: InputDecoder::from_config(config),
            features: SessionFeatures::NONE,
            saved: None,
            signal_guard: None,
            out,
            live: false,
        })
    }

    fn arm_cleanup_hooks(&mut self, original: &Termios) {
        crate::install_panic_hook();
        let guard = self
            .tty
            .try_clone()
            .and_then(|tty| SignalGuard::install(tty, original.clone()));
        match guard {
            Ok(guard) => self.signal_guard = Some(guard),
            Err(err) => tracing::warn!(error = %err, "signal cleanup unavailable"),
        }
    }
}

impl TerminalSession for UnixSession {
    fn platform(&self) -> Platform {
        Platform::current()
    }

    fn enter_raw_mode(&mut self) -> Result<(), SessionError> {
        if self.saved.is_some() {
            return Ok(());
        }
        let original = match termios::tcgetattr(&self.tty) {
            Ok(original) => original,
            Err(Errno::ENOTTY) => return Err(SessionError::NotATerminal),
            Err(e) => return Err(SessionError::Io(e.into())),
        };
        let mut raw = original.clone();
        termios::cfmakeraw(&mut raw);
        termios::tcsetattr(&self.tty, SetArg::TCSAFLUSH, &raw)
            .map_err(|e| SessionError::Io(e.into()))?;
        if self.live {
            self.arm_cleanup_hooks(&original);
        }
        self.saved = Some(original);
        tracing::info!(platform = %self.platform(), "raw mode entered");
        Ok(())
    }

    fn exit_raw_mode(&mut self) -> Result<(), SessionError> {
        let Some(original) = self.saved.take() else {
            return Ok(());
        };
        self.signal_guard = None;
        termios::tcsetattr(&self.tty, SetArg::TCSADRAIN, &original)
            .map_err(|e| SessionError::Restore(e.into()))?;
        tracing::info!(platform = %self.platform(), "raw mode restored");
        Ok(())
    }

    fn is_raw(&self) -> bool {
        self.saved.is_some()
    }

    fn features(&self) -> SessionFeatures {
        self.features
    }

    fn set_features(&mut self, features: SessionFeatures) -> io::Result<()> {
        let mut buf = Vec::new();
        write_feature_delta(&self.features, &features, &mut buf)?;
        if buf.is_empty() {
            return Ok(());
        }
        self.out.write_all(&buf)?;
        self.out.flush()?;
        log_feature_change(self.platform(), self.features, features);
        self.features = features;
        if self.live {
            crate::record_active_features(features);
        }
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn size(&self) -> io::Result<(u16, u16)> {
        if let Ok(ws) = rustix::termios::tcgetwinsize(&self.tty) {
            if ws.ws_col > 0 && ws.ws_row > 0 {
                return Ok((ws.ws_col, ws.ws_row));
            }
        }
        Ok(size_from_env().unwrap_or(DEFAULT_SIZE))
    }

    fn poll_event(&mut self, timeout: Duration) -> io::Result<Option<Event>> {
        self.decoder.next_event(&mut self.input, timeout)
    }

    fn try_clone_input(&self) -> io::Result<Box<dyn ByteSource + Send>> {
        Ok(Box::new(self.input.try_clone()?))
    }
}

impl Drop for UnixSession {
    fn drop(&mut self) {
        if self.saved.is_none() && self.features.is_none() {
            return;
        }
        if let Err(err) = self.shutdown() {
            tracing::error!(error = %err, "terminal restore failed during drop");
        }
    }
}
