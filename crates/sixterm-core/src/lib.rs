#![forbid(unsafe_code)]

//! Core input and configuration types for sixterm.
//!
//! - [`event`]: the `Event` / `KeyEvent` / `MouseEvent` vocabulary
//! - [`input_decoder`]: the escape-sequence state machine
//! - [`byte_source`]: the timed byte-read seam backends implement
//! - [`config`]: `TerminalConfig`, computed once at startup
//! - [`logging`]: optional file-backed `tracing` subscriber

pub mod byte_source;
pub mod config;
pub mod event;
pub mod input_decoder;
pub mod logging;

pub use byte_source::{ByteSource, ScriptedInput};
pub use config::{Platform, TerminalConfig};
pub use event::{Direction, Event, KeyEvent, MouseButton, MouseEvent, MouseEventKind, SpecialKey};
pub use input_decoder::InputDecoder;
