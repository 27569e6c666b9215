#![forbid(unsafe_code)]

//! Startup-time terminal configuration.
//!
//! Platform and environment probing happens exactly once, in
//! [`TerminalConfig::detect`]. The resulting value is passed into sessions,
//! decoders, the input thread and the presenter; nothing below this module
//! reads the environment for tuning decisions.
//!
//! # TOML Format
//!
//! With the `config` feature, a config can be loaded from TOML. Durations
//! are integer milliseconds and missing fields take their defaults:
//!
//! ```toml
//! escape_timeout_ms = 100
//! min_render_interval_ms = 100
//! pixel_scale = 2
//! mouse = true
//! alternate_screen = false
//! ```

use std::fmt;
use std::time::Duration;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "config")]
use std::path::Path;

/// Host platform family, as far as terminal handling cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Linux and other non-macOS Unix systems.
    Unix,
    MacOs,
    Windows,
}

impl Platform {
    /// The platform this binary was compiled for.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unix => "unix",
            Self::MacOs => "macos",
            Self::Windows => "windows",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tuning values shared by the session, decoder and frame loop.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct TerminalConfig {
    /// Wait for the byte after `ESC` and between bytes of a sequence.
    /// Default: 50 ms (100 ms on macOS).
    #[cfg_attr(feature = "config", serde(rename = "escape_timeout_ms", with = "duration_ms"))]
    pub escape_timeout: Duration,
    /// Read timeout of the background input thread; bounds how long a stop
    /// request can go unobserved. Default: 50 ms.
    #[cfg_attr(
        feature = "config",
        serde(rename = "input_poll_interval_ms", with = "duration_ms")
    )]
    pub input_poll_interval: Duration,
    /// Minimum time between two presented frames. Default: 50 ms (100 ms on macOS).
    #[cfg_attr(
        feature = "config",
        serde(rename = "min_render_interval_ms", with = "duration_ms")
    )]
    pub min_render_interval: Duration,
    /// Integer upscaling applied by applications to their canvas.
    /// Default: 2 under iTerm2 on macOS, else 1.
    pub pixel_scale: u32,
    /// Enable SGR mouse reporting when the session starts. Default: true.
    pub mouse: bool,
    /// Draw on the alternate screen instead of inline. Default: false.
    pub alternate_screen: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self::for_platform(Platform::current(), None)
    }
}

impl TerminalConfig {
    /// Probe the platform and `TERM_PROGRAM` once.
    #[must_use]
    pub fn detect() -> Self {
        let term_program = std::env::var("TERM_PROGRAM").ok();
        let config = Self::for_platform(Platform::current(), term_program.as_deref());
        tracing::debug!(
            platform = %Platform::current(),
            term_program = ?term_program,
            escape_timeout = ?config.escape_timeout,
            pixel_scale = config.pixel_scale,
            "terminal config detected"
        );
        config
    }

    /// Defaults for a given platform and terminal emulator name.
    #[must_use]
    pub fn for_platform(platform: Platform, term_program: Option<&str>) -> Self {
        let macos = platform == Platform::MacOs;
        let slow = if macos { 100 } else { 50 };
        Self {
            escape_timeout: Duration::from_millis(slow),
            input_poll_interval: Duration::from_millis(50),
            min_render_interval: Duration::from_millis(slow),
            pixel_scale: if macos && term_program == Some("iTerm.app") {
                2
            } else {
                1
            },
            mouse: true,
            alternate_screen: false,
        }
    }

    /// Validate values. Returns a list of problems (empty = valid).
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.escape_timeout.is_zero() {
            errors.push("escape_timeout must be > 0".into());
        }
        if self.input_poll_interval.is_zero() {
            errors.push("input_poll_interval must be > 0".into());
        }
        if self.pixel_scale == 0 {
            errors.push("pixel_scale must be > 0".into());
        }
        errors
    }

    /// Parse a config from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load a config from a TOML file.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Serialize to a TOML string.
    #[cfg(feature = "config")]
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

/// Errors from loading a [`TerminalConfig`].
#[cfg(feature = "config")]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[source] std::io::Error),
    #[error("config parse error: {0}")]
    Toml(#[source] toml::de::Error),
    #[error("config serialize error: {0}")]
    Serialize(#[source] toml::ser::Error),
}

#[cfg(feature = "config")]
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let ms = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(ms)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
