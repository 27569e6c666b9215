#![forbid(unsafe_code)]

//! File-backed log output.
//!
//! Rendered frames own stdout, so diagnostics go to a file. Libraries in this
//! workspace only emit `tracing` events; applications opt into a subscriber
//! here.

/// Environment variable that overrides the filter passed to
/// [`init_file_logging`].
pub const LOG_ENV: &str = "SIXTERM_LOG";

/// Install a global `fmt` subscriber writing plain text to `path`.
///
/// The filter comes from `SIXTERM_LOG` when set, else `default_filter`
/// (e.g. `"info"` or `"sixterm_core=debug"`). Fails if the file cannot be
/// created or a global subscriber is already installed.
#[cfg(feature = "tracing-subscriber")]
pub fn init_file_logging(
    path: impl AsRef<std::path::Path>,
    default_filter: &str,
) -> std::io::Result<()> {
    use std::sync::Mutex;
    use tracing_subscriber::EnvFilter;

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_ref())?;
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(std::io::Error::other)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(std::io::Error::other)
}

#[cfg(all(test, feature = "tracing-subscriber"))]
mod tests {
    use super::*;

    #[test]
    fn writes_events_to_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sixterm.log");
        init_file_logging(&path, "info").expect("first init succeeds");
        tracing::info!(probe = 7, "logging smoke test");
        let contents = std::fs::read_to_string(&path).expect("log file exists");
        assert!(contents.contains("logging smoke test"), "{contents}");

        // A second global subscriber is refused.
        assert!(init_file_logging(&path, "info").is_err());
    }
}
