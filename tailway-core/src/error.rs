use thiserror::Error;

/// The live stream failed to open or closed unexpectedly.
///
/// Never fatal: the engine drops to "not live" and keeps whatever the
/// record window already holds.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open stream for channel '{channel}': {reason}")]
    Connect { channel: String, reason: String },

    #[error("stream for channel '{channel}' closed unexpectedly: {reason}")]
    Closed { channel: String, reason: String },

    #[error("keepalive probe could not be sent: {reason}")]
    Probe { reason: String },

    #[error("channel '{channel}' is unreachable: {reason}")]
    Unreachable { channel: String, reason: String },
}

impl TransportError {
    pub fn connect(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Connect {
            channel: channel.into(),
            reason: reason.into(),
        }
    }

    pub fn closed(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Closed {
            channel: channel.into(),
            reason: reason.into(),
        }
    }
}

/// A snapshot query failed.
///
/// Never fatal: no records are seeded and the previous window contents
/// are retained.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("snapshot query for channel '{channel}' failed: {reason}")]
    Query { channel: String, reason: String },

    #[error("snapshot response for channel '{channel}' was malformed: {reason}")]
    Decode { channel: String, reason: String },
}

impl FetchError {
    pub fn query(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Query {
            channel: channel.into(),
            reason: reason.into(),
        }
    }
}

/// A malformed inbound stream message.
///
/// Dropped silently per record; the engine only counts these for
/// diagnostics.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("inbound frame is not valid JSON: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
    },

    #[error("inbound frame has no event tag")]
    MissingTag,

    #[error("log_line event carries no record payload")]
    MissingPayload,
}

/// Engine parameters or a producer-side control mutation were rejected.
///
/// Surfaced to the caller; displayed producer levels are never updated
/// optimistically on this path.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cap_floor ({floor}) must be lower than cap_max ({max})")]
    CapacityBounds { floor: usize, max: usize },

    #[error("{field} must be nonzero")]
    ZeroField { field: &'static str },

    #[error("channel taxonomy is empty")]
    EmptyTaxonomy,

    #[error("producer rejected level change for component '{component}': {reason}")]
    LevelRejected { component: String, reason: String },

    #[error("producer-side level control is not supported by this transport")]
    LevelControlUnsupported,
}

impl ConfigError {
    pub fn level_rejected(component: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LevelRejected {
            component: component.into(),
            reason: reason.into(),
        }
    }
}
