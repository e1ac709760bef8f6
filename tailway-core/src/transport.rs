use crate::channel::{ChannelKey, ChannelSpec};
use crate::error::{ConfigError, FetchError, TransportError};
use crate::filter::FilterCriteria;
use crate::record::{LogLevel, LogRecord};
use async_trait::async_trait;

/// Text sent as the periodic keepalive probe. The reply, if any, arrives
/// as an ordinary tagged frame and is ignored.
pub const KEEPALIVE_PROBE: &str = "ping";

/// Opaque bearer credential for the push transport.
///
/// Always passed in by the host; this crate never reads ambient state to
/// obtain one.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    /// Redacted so credentials cannot leak through logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(..)")
    }
}

/// Liveness and size of one channel's backing source.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelStatus {
    pub exists: bool,
    pub size_bytes: u64,
}

/// Answers whether a channel's backing source is reachable right now.
#[async_trait]
pub trait ChannelProbe: Send + Sync {
    async fn probe(&self, spec: &ChannelSpec) -> Result<ChannelStatus, TransportError>;
}

/// Request/response source for a bounded historical tail.
///
/// Implementations must be idempotent and retry-safe; the engine may
/// abandon a call's result at any time (a newer filter superseded it).
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch up to `limit` records matching `filter`, oldest first.
    async fn fetch(
        &self,
        channel: &ChannelKey,
        filter: &FilterCriteria,
        limit: usize,
    ) -> Result<Vec<LogRecord>, FetchError>;
}

/// One established push connection.
///
/// Owned exclusively by the session task that created it; dropped on
/// every teardown path.
#[async_trait]
pub trait StreamConnection: Send {
    /// Next raw inbound message. `None` means the transport closed the
    /// connection in an orderly way; an error is an abnormal close.
    async fn next_message(&mut self) -> Option<Result<String, TransportError>>;

    /// Send a lightweight plain-text probe. A missing reply is not an
    /// error; only the transport's own close/error signals liveness.
    async fn send_probe(&mut self, probe: &str) -> Result<(), TransportError>;
}

/// Factory for push connections, addressed by channel plus credential.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn connect(
        &self,
        channel: &ChannelKey,
        credential: &Credential,
    ) -> Result<Box<dyn StreamConnection>, TransportError>;
}

/// Producer-side verbosity control.
///
/// This adjusts what the upstream emitter writes, not the client-side
/// filter. A successful mutation is always followed by a status read;
/// the engine never displays a level the producer has not confirmed.
#[async_trait]
pub trait ProducerLevelControl: Send + Sync {
    async fn set_level(&self, component: &str, level: LogLevel) -> Result<(), ConfigError>;

    async fn current_level(&self, component: &str) -> Result<Option<LogLevel>, ConfigError>;
}
