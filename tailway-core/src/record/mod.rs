mod parse;

pub use parse::{parse_frame, parse_record};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Severity of a log record.
///
/// A closed set; styling and labels for the UI live outside this crate.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Parse a producer-supplied level name. Case-insensitive; unknown
    /// names map to None rather than an error so one odd record cannot
    /// poison a stream.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARNING" | "WARN" => Some(LogLevel::Warning),
            "ERROR" => Some(LogLevel::Error),
            "CRITICAL" | "FATAL" => Some(LogLevel::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One log line as delivered by a snapshot query or the live stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    /// Absent when the producer emitted an unlevelled line.
    pub level: Option<LogLevel>,
    /// Producer-side origin, e.g. a module path or process name.
    pub source_tag: String,
    pub message: String,
    /// Structured payload the producer attached, passed through opaque.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,
}

/// A decoded inbound stream message.
///
/// The transport multiplexes several tagged event kinds over one
/// connection; the engine only consumes `log_line`, everything else is
/// acknowledged and ignored.
#[derive(Debug)]
pub enum InboundFrame {
    LogLine(LogRecord),
    /// A recognized event the engine has no use for (e.g. a probe reply).
    Ignored,
}
