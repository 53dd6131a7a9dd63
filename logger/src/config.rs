//! Logger configuration, embeddable into the client configuration file.

use std::path::PathBuf;

use derive_more::Display;
use serde::{Deserialize, Serialize};

const DEFAULT_COMPACT_MODE: bool = false;
const DEFAULT_TERMINAL_COLORS: bool = true;

/// Maximum log level, for reading from configuration and (de)serializing.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize, Serialize,
)]
#[allow(missing_docs, clippy::upper_case_acronyms)]
pub enum Level {
    TRACE,
    DEBUG,
    #[default]
    INFO,
    WARN,
    ERROR,
}

impl From<Level> for tracing::Level {
    fn from(level: Level) -> Self {
        match level {
            Level::TRACE => Self::TRACE,
            Level::DEBUG => Self::DEBUG,
            Level::INFO => Self::INFO,
            Level::WARN => Self::WARN,
            Level::ERROR => Self::ERROR,
        }
    }
}

/// Configuration for [`crate`].
#[derive(Clone, Deserialize, Serialize, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Configuration {
    /// Maximum log level.
    pub max_log_level: Level,
    /// Compact mode (single-line events, no span context).
    pub compact_mode: bool,
    /// Whether to colorize terminal output.
    pub terminal_colors: bool,
    /// Append events to this file instead of the terminal.
    pub log_file_path: Option<PathBuf>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            max_log_level: Level::default(),
            compact_mode: DEFAULT_COMPACT_MODE,
            terminal_colors: DEFAULT_TERMINAL_COLORS,
            log_file_path: None,
        }
    }
}
