//! Windows backend: console modes with virtual-terminal processing.
//!
//! Raw mode clears line input, echo and Ctrl-C processing on the input
//! handle and enables VT input and output, so the console speaks the same
//! escape vocabulary as a Unix terminal. Console handles are looked up on
//! every call; they are process-wide and not `Send`.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use windows::Win32::Foundation::{HANDLE, WAIT_OBJECT_0};
use windows::Win32::System::Console::{
    CONSOLE_MODE, CONSOLE_SCREEN_BUFFER_INFO, ENABLE_ECHO_INPUT, ENABLE_EXTENDED_FLAGS,
    ENABLE_LINE_INPUT, ENABLE_PROCESSED_INPUT, ENABLE_QUICK_EDIT_MODE,
    ENABLE_VIRTUAL_TERMINAL_INPUT, ENABLE_VIRTUAL_TERMINAL_PROCESSING, GetConsoleMode,
    GetConsoleScreenBufferInfo, GetNumberOfConsoleInputEvents, GetStdHandle, INPUT_RECORD,
    KEY_EVENT, ReadConsoleInputW, STD_HANDLE, STD_INPUT_HANDLE, STD_OUTPUT_HANDLE,
    SetConsoleMode,
};
use windows::Win32::System::Threading::WaitForSingleObject;

use sixterm_backend::session::log_feature_change;
use sixterm_backend::{
    DEFAULT_SIZE, SessionError, SessionFeatures, TerminalSession, size_from_env,
    write_feature_delta,
};
use sixterm_core::{ByteSource, Event, InputDecoder, Platform, TerminalConfig};

use crate::utf16::Utf16Assembler;

/// Records fetched per `ReadConsoleInputW` call.
const RECORD_BATCH: usize = 64;

// ── Console helpers ──────────────────────────────────────────────────────

fn std_handle(which: STD_HANDLE) -> io::Result<HANDLE> {
    // SAFETY: GetStdHandle has no preconditions.
    unsafe { GetStdHandle(which) }.map_err(io::Error::from)
}

fn console_mode(handle: HANDLE) -> io::Result<u32> {
    let mut mode = CONSOLE_MODE(0);
    // SAFETY: `mode` is a valid out-pointer for the duration of the call.
    unsafe { GetConsoleMode(handle, &mut mode) }.map_err(io::Error::from)?;
    Ok(mode.0)
}

fn set_console_mode(handle: HANDLE, mode: u32) -> io::Result<()> {
    // SAFETY: plain value argument.
    unsafe { SetConsoleMode(handle, CONSOLE_MODE(mode)) }.map_err(io::Error::from)
}

/// Input mode for raw reads: no line editing, no echo, Ctrl-C delivered as
/// a byte, quick-edit off, VT sequences for special keys.
fn raw_input_mode(original: u32) -> u32 {
    let cleared = ENABLE_LINE_INPUT.0
        | ENABLE_ECHO_INPUT.0
        | ENABLE_PROCESSED_INPUT.0
        | ENABLE_QUICK_EDIT_MODE.0;
    (original & !cleared) | ENABLE_EXTENDED_FLAGS.0 | ENABLE_VIRTUAL_TERMINAL_INPUT.0
}

// ── Input ────────────────────────────────────────────────────────────────

/// Timed byte reader over the console input buffer.
///
/// Key-down events are converted from UTF-16 to UTF-8 bytes; with VT input
/// enabled, special keys already arrive as escape sequences. Other records
/// (focus, resize, menu) are consumed and ignored.
#[derive(Debug, Default)]
pub struct ConsoleInput {
    buffered: VecDeque<u8>,
    text: Utf16Assembler,
}

impl ConsoleInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until the input handle is signaled or `timeout` passes.
    fn wait(handle: HANDLE, timeout: Duration) -> bool {
        let ms: u32 = timeout
            .as_millis()
            .try_into()
            .unwrap_or(u32::MAX)
            .min(u32::MAX - 1);
        // SAFETY: `handle` is the process's console input handle.
        unsafe { WaitForSingleObject(handle, ms) } == WAIT_OBJECT_0
    }

    /// Read every pending record without blocking.
    fn drain(&mut self, handle: HANDLE) -> io::Result<()> {
        let mut available = 0u32;
        // SAFETY: `available` is a valid out-pointer.
        unsafe { GetNumberOfConsoleInputEvents(handle, &mut available) }
            .map_err(io::Error::from)?;
        while available > 0 {
            let mut records = [INPUT_RECORD::default(); RECORD_BATCH];
            let mut read = 0u32;
            // SAFETY: `records` outlives the call and `read` is a valid out-pointer.
            unsafe { ReadConsoleInputW(handle, &mut records, &mut read) }
                .map_err(io::Error::from)?;
            if read == 0 {
                break;
            }
            for record in &records[..read as usize] {
                self.push_record(record);
            }
            available = available.saturating_sub(read);
        }
        Ok(())
    }

    fn push_record(&mut self, record: &INPUT_RECORD) {
        if u32::from(record.EventType) != KEY_EVENT {
            return;
        }
        // SAFETY: EventType says the union holds a key event.
        let key = unsafe { record.Event.KeyEvent };
        if !key.bKeyDown.as_bool() {
            return;
        }
        // SAFETY: key events always populate the UTF-16 member.
        let unit = unsafe { key.uChar.UnicodeChar };
        if unit == 0 {
            return;
        }
        for _ in 0..key.wRepeatCount.max(1) {
            self.text.push(unit, &mut self.buffered);
        }
    }
}

impl ByteSource for ConsoleInput {
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        if let Some(byte) = self.buffered.pop_front() {
            return Ok(Some(byte));
        }
        let handle = std_handle(STD_INPUT_HANDLE)?;
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !Self::wait(handle, remaining) {
                return Ok(None);
            }
            self.drain(handle)?;
            if let Some(byte) = self.buffered.pop_front() {
                return Ok(Some(byte));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }
}

// ── Session ──────────────────────────────────────────────────────────────

/// Console modes captured by `enter_raw_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SavedModes {
    input: u32,
    output: u32,
}

/// Terminal session on the process console.
pub struct WindowsSession {
    input: ConsoleInput,
    decoder: InputDecoder,
    features: SessionFeatures,
    saved: Option<SavedModes>,
    out: io::Stdout,
}

impl WindowsSession {
    /// Attach to the process console.
    ///
    /// Fails with [`SessionError::NotATerminal`] when stdin is redirected.
    pub fn open(config: &TerminalConfig) -> Result<Self, SessionError> {
        let input = std_handle(STD_INPUT_HANDLE)?;
        if console_mode(input).is_err() {
            return Err(SessionError::NotATerminal);
        }
        Ok(Self {
            input: ConsoleInput::new(),
            decoder: InputDecoder::from_config(config),
            features: SessionFeatures::NONE,
            saved: None,
            out: io::stdout(),
        })
    }
}

impl TerminalSession for WindowsSession {
    fn platform(&self) -> Platform {
        Platform::Windows
    }

    fn enter_raw_mode(&mut self) -> Result<(), SessionError> {
        if self.saved.is_some() {
            return Ok(());
        }
        let input = std_handle(STD_INPUT_HANDLE)?;
        let output = std_handle(STD_OUTPUT_HANDLE)?;
        let saved = SavedModes {
            input: console_mode(input).map_err(|_| SessionError::NotATerminal)?,
            output: console_mode(output).map_err(|_| SessionError::NotATerminal)?,
        };
        set_console_mode(input, raw_input_mode(saved.input))?;
        if let Err(err) = set_console_mode(output, saved.output | ENABLE_VIRTUAL_TERMINAL_PROCESSING.0)
        {
            let _ = set_console_mode(input, saved.input);
            return Err(SessionError::Io(err));
        }
        crate::install_panic_hook();
        self.saved = Some(saved);
        tracing::info!(
            platform = %self.platform(),
            input_mode = saved.input,
            output_mode = saved.output,
            "raw mode entered"
        );
        Ok(())
    }

    fn exit_raw_mode(&mut self) -> Result<(), SessionError> {
        let Some(saved) = self.saved.take() else {
            return Ok(());
        };
        let input = std_handle(STD_INPUT_HANDLE).map_err(SessionError::Restore)?;
        let output = std_handle(STD_OUTPUT_HANDLE).map_err(SessionError::Restore)?;
        let restored_input = set_console_mode(input, saved.input);
        let restored_output = set_console_mode(output, saved.output);
        restored_input
            .and(restored_output)
            .map_err(SessionError::Restore)?;
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
        crate::record_active_features(features);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn size(&self) -> io::Result<(u16, u16)> {
        let output = std_handle(STD_OUTPUT_HANDLE)?;
        let mut info = CONSOLE_SCREEN_BUFFER_INFO::default();
        // SAFETY: `info` is a valid out-pointer.
        if unsafe { GetConsoleScreenBufferInfo(output, &mut info) }.is_ok() {
            let window = info.srWindow;
            let cols = i32::from(window.Right) - i32::from(window.Left) + 1;
            let rows = i32::from(window.Bottom) - i32::from(window.Top) + 1;
            if let (Ok(cols), Ok(rows)) = (u16::try_from(cols), u16::try_from(rows)) {
                if cols > 0 && rows > 0 {
                    return Ok((cols, rows));
                }
            }
        }
        Ok(size_from_env().unwrap_or(DEFAULT_SIZE))
    }

    fn poll_event(&mut self, timeout: Duration) -> io::Result<Option<Event>> {
        self.decoder.next_event(&mut self.input, timeout)
    }

    fn try_clone_input(&self) -> io::Result<Box<dyn ByteSource + Send>> {
        Ok(Box::new(ConsoleInput::new()))
    }
}

impl Drop for WindowsSession {
    fn drop(&mut self) {
        if self.saved.is_none() && self.features.is_none() {
            return;
        }
        if let Err(err) = self.shutdown() {
            tracing::error!(error = %err, "terminal restore failed during drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_input_mode_clears_cooked_flags() {
        let cooked = ENABLE_LINE_INPUT.0
            | ENABLE_ECHO_INPUT.0
            | ENABLE_PROCESSED_INPUT.0
            | ENABLE_QUICK_EDIT_MODE.0;
        let raw = raw_input_mode(cooked);
        assert_eq!(raw & ENABLE_LINE_INPUT.0, 0);
        assert_eq!(raw & ENABLE_ECHO_INPUT.0, 0);
        assert_eq!(raw & ENABLE_PROCESSED_INPUT.0, 0);
        assert_eq!(raw & ENABLE_QUICK_EDIT_MODE.0, 0);
        assert_ne!(raw & ENABLE_VIRTUAL_TERMINAL_INPUT.0, 0);
        assert_ne!(raw & ENABLE_EXTENDED_FLAGS.0, 0);
    }
}
