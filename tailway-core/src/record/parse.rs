use crate::error::ParseError;
use crate::record::{InboundFrame, LogLevel, LogRecord};
use chrono::Utc;
use serde_json::Value;

/// Decode one raw inbound stream message.
///
/// Messages are JSON objects tagged with an `event` field. `log_line`
/// carries a record payload; any other recognized tag (probe replies,
/// server notices) is ignored.
pub fn parse_frame(raw: &str) -> Result<InboundFrame, ParseError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|source| ParseError::Json { source })?;

    let tag = value
        .get("event")
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingTag)?;

    if tag != "log_line" {
        return Ok(InboundFrame::Ignored);
    }

    let payload = value
        .get("record")
        .filter(|v| v.is_object())
        .ok_or(ParseError::MissingPayload)?;

    Ok(InboundFrame::LogLine(parse_record(payload)))
}

/// Extract a record from a JSON object, tolerating missing fields.
///
/// Producers are inconsistent about what they emit; a record is never
/// rejected for a missing timestamp or level, only a missing envelope.
pub fn parse_record(payload: &Value) -> LogRecord {
    let timestamp = payload
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    let level = payload
        .get("level")
        .and_then(Value::as_str)
        .and_then(LogLevel::parse);

    let source_tag = payload
        .get("source")
        .or_else(|| payload.get("target"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("<no message>")
        .to_string();

    let extra = payload
        .get("extra")
        .and_then(Value::as_object)
        .cloned()
        .filter(|m| !m.is_empty());

    LogRecord {
        timestamp,
        level,
        source_tag,
        message,
        extra,
    }
}
