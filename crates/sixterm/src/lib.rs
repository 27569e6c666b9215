#![forbid(unsafe_code)]

//! sixterm public facade crate.
//!
//! Pixel graphics in the terminal: draw palette indices into a
//! [`PixelCanvas`], encode them as sixel, and read keyboard and mouse input
//! from a raw-mode session that is always restored on exit.
//!
//! ```no_run
//! use sixterm::prelude::*;
//!
//! struct Hello {
//!     palette: ColorPalette,
//! }
//!
//! impl App for Hello {
//!     fn canvas_size(&self) -> (u32, u32) {
//!         (64, 48)
//!     }
//!
//!     fn palette(&self) -> &ColorPalette {
//!         &self.palette
//!     }
//!
//!     fn handle_event(&mut self, event: Event) -> Control {
//!         match event.as_key() {
//!             Some(key) if key.is_quit() => Control::Quit,
//!             _ => Control::Continue,
//!         }
//!     }
//!
//!     fn render(&self, canvas: &mut PixelCanvas) {
//!         for x in 0..64 {
//!             canvas.set(x, 24, 1);
//!         }
//!     }
//! }
//!
//! fn main() -> sixterm::Result<()> {
//!     let mut palette = ColorPalette::new();
//!     palette.register("background", 0, 0, 0)?;
//!     palette.register("line", 0, 255, 128)?;
//!     sixterm::run(&mut Hello { palette })?;
//!     Ok(())
//! }
//! ```

// --- Core re-exports -------------------------------------------------------

pub use sixterm_core::{
    ByteSource, Direction, Event, InputDecoder, KeyEvent, MouseButton, MouseEvent,
    MouseEventKind, Platform, ScriptedInput, SpecialKey, TerminalConfig,
};

// --- Render re-exports -----------------------------------------------------

pub use sixterm_render::{
    ColorPalette, DecodeError, DecodedImage, PaletteError, PixelCanvas, Rgb, RoundTripError,
    SixelDecoder, SixelEncoder, encode_frame, verify_roundtrip,
};

// --- Session re-exports ----------------------------------------------------

pub use sixterm_backend::{SessionError, SessionFeatures, SessionGuard, TerminalSession};
pub use sixterm_tty::{HeadlessSession, install_panic_hook, open_session};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use sixterm_runtime::{
    App, Control, CooperativePump, FramePresenter, InputThread, Placement, RunStats,
    run_cooperative, run_threaded,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for sixterm apps.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Raw mode, feature toggles, or terminal I/O failed.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// A color could not be registered or looked up.
    #[error(transparent)]
    Palette(#[from] PaletteError),
    /// A sixel stream could not be parsed.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// I/O outside a session.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Standard result type for sixterm APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Entry point ----------------------------------------------------------

/// Open the process terminal with detected settings and run `app` with a
/// background input thread until it quits.
#[cfg(feature = "runtime")]
pub fn run<A: App + ?Sized>(app: &mut A) -> Result<RunStats> {
    let config = TerminalConfig::detect();
    run_with_config(app, &config)
}

/// Like [`run`], with explicit settings.
#[cfg(feature = "runtime")]
pub fn run_with_config<A: App + ?Sized>(app: &mut A, config: &TerminalConfig) -> Result<RunStats> {
    let session = open_session(config)?;
    Ok(run_threaded(session, app, config)?)
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        ColorPalette, Error, Event, KeyEvent, MouseButton, MouseEvent, PixelCanvas, Result,
        SpecialKey, TerminalConfig, TerminalSession,
    };

    #[cfg(feature = "runtime")]
    pub use crate::{App, Control};

    pub use crate::{backend, core, render, tty};

    #[cfg(feature = "runtime")]
    pub use crate::runtime;
}

pub use sixterm_backend as backend;
pub use sixterm_core as core;
pub use sixterm_render as render;
#[cfg(feature = "runtime")]
pub use sixterm_runtime as runtime;
pub use sixterm_tty as tty;

#[cfg(all(test, feature = "runtime"))]
mod tests {
    use super::prelude::*;
    use super::*;

    struct Bar {
        palette: ColorPalette,
    }

    impl App for Bar {
        fn canvas_size(&self) -> (u32, u32) {
            (6, 6)
        }

        fn palette(&self) -> &ColorPalette {
            &self.palette
        }

        fn handle_event(&mut self, event: Event) -> Control {
            match event.as_key() {
                Some(key) if key.is_quit() => Control::Quit,
                _ => Control::Continue,
            }
        }

        fn render(&self, canvas: &mut PixelCanvas) {
            canvas.set(0, 0, 1);
        }
    }

    #[test]
    fn palette_overflow_converts() {
        let mut palette = ColorPalette::with_capacity_limit(1);
        palette.register("a", 1, 2, 3).unwrap();
        let err: Error = palette.register("b", 4, 5, 6).unwrap_err().into();
        assert!(matches!(err, Error::Palette(PaletteError::Overflow { .. })));
    }

    #[test]
    fn prelude_app_runs_headless() {
        let mut palette = ColorPalette::new();
        palette.register("bg", 0, 0, 0).unwrap();
        palette.register("fg", 255, 255, 255).unwrap();
        let session = HeadlessSession::new(40, 20);
        session.input().push(b"\x03");
        let output = session.output();
        let config = TerminalConfig {
            min_render_interval: std::time::Duration::ZERO,
            ..TerminalConfig::default()
        };
        let stats = run_cooperative(session, &mut Bar { palette }, &config).unwrap();
        assert_eq!(stats.frames, 1);
        assert!(output.bytes().windows(3).any(|w| w == b"\x1bPq"));
    }

    #[test]
    fn session_errors_convert() {
        let err: Error = SessionError::NotATerminal.into();
        assert!(err.to_string().contains("terminal"));
    }
}
