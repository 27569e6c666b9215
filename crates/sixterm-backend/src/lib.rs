#![forbid(unsafe_code)]
#![doc = "Session abstraction for sixterm: raw mode, feature toggles, and guaranteed restore."]
#![doc = ""]
#![doc = "This crate defines the boundary between the frame loop and the platform"]
#![doc = "backends in `sixterm-tty` (termios on Unix, console modes on Windows)."]

pub mod guard;
pub mod sequences;
pub mod session;

pub use guard::SessionGuard;
pub use sequences::{SessionFeatures, write_cleanup_sequence, write_feature_delta};
pub use session::{DEFAULT_SIZE, SessionError, TerminalSession, size_from_env};
