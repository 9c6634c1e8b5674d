//! Log line format module
//!
//! Supports two line formats:
//! - `plain` (timestamp, level, target, message)
//! - `json` (one JSON object per line)

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};

/// Log severity, ordered from most to least verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level {other:?}")),
        }
    }
}

/// Line format selected by `logging.format`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineFormat {
    #[default]
    Plain,
    Json,
}

impl FromStr for LineFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?}")),
        }
    }
}

/// A single log event
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub time: DateTime<Local>,
    pub level: Level,
    /// Component that emitted the event (e.g. `factory`, `demo`)
    pub target: &'static str,
    pub message: String,
}

impl LogRecord {
    /// Create a record stamped with the current local time
    pub fn new(level: Level, target: &'static str, message: String) -> Self {
        Self {
            time: Local::now(),
            level,
            target,
            message,
        }
    }

    pub fn format(&self, format: LineFormat) -> String {
        match format {
            LineFormat::Plain => self.format_plain(),
            LineFormat::Json => self.format_json(),
        }
    }

    fn format_plain(&self) -> String {
        format!(
            "{} {:<5} [{}] {}",
            self.time.format("%Y-%m-%dT%H:%M:%S%.3f%z"),
            self.level.as_str(),
            self.target,
            self.message,
        )
    }

    fn format_json(&self) -> String {
        format!(
            r#"{{"time":"{}","level":"{}","target":"{}","message":"{}"}}"#,
            self.time.to_rfc3339(),
            self.level.as_str(),
            escape_json(self.target),
            escape_json(&self.message),
        )
    }
}

/// Escape special characters for JSON string
fn escape_json(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}
