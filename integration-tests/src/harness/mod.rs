mod probe;
mod producer;
mod snapshots;
mod stream;
pub mod tracing;

pub use probe::StaticProbe;
pub use producer::ScriptedProducer;
pub use snapshots::ScriptedSnapshots;
pub use stream::{FakeStreamTransport, StreamHandle};
pub use tracing::init_test_tracing;

use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use tailway_core::channel::service_taxonomy;
use tailway_core::config::EngineConfig;
use tailway_core::engine::LogEngine;
use tailway_core::record::{LogLevel, LogRecord};
use tailway_core::transport::Credential;

/// One engine wired to scriptable fakes for every transport seam.
pub struct EngineHarness {
    pub engine: LogEngine,
    pub snapshots: Arc<ScriptedSnapshots>,
    pub transport: Arc<FakeStreamTransport>,
    pub producer: Arc<ScriptedProducer>,
    pub probe: Arc<StaticProbe>,
}

impl EngineHarness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(cfg: EngineConfig) -> Self {
        init_test_tracing();

        let snapshots = ScriptedSnapshots::new();
        let transport = FakeStreamTransport::new();
        let producer = Arc::new(ScriptedProducer::new());
        let probe = Arc::new(StaticProbe::new());

        let engine = LogEngine::new(
            service_taxonomy(),
            probe.clone(),
            snapshots.clone(),
            transport.clone(),
            producer.clone(),
            Credential::new("test-token"),
            cfg,
        )
        .expect("engine config must be valid");

        Self {
            engine,
            snapshots,
            transport,
            producer,
            probe,
        }
    }

    /// Messages currently in the window, in view order.
    pub fn messages(&self) -> Vec<String> {
        self.engine.view().map(|r| r.message.clone()).collect()
    }
}

impl Default for EngineHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A record with a fixed timestamp; ordering in these tests comes from
/// arrival order, never from clock values.
pub fn record(level: Option<LogLevel>, message: &str) -> LogRecord {
    LogRecord {
        timestamp: Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap(),
        level,
        source_tag: "app".to_string(),
        message: message.to_string(),
        extra: None,
    }
}

pub fn error_record(message: &str) -> LogRecord {
    record(Some(LogLevel::Error), message)
}

/// Raw record payload as the wire carries it inside a `log_line` frame.
pub fn line_json(level: &str, message: &str) -> Value {
    json!({
        "timestamp": "2026-08-01T12:00:00Z",
        "level": level,
        "source": "app",
        "message": message
    })
}
