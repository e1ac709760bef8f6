use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tailway_core::channel::ChannelSpec;
use tailway_core::error::TransportError;
use tailway_core::transport::{ChannelProbe, ChannelStatus};

/// Channel probe answering from a fixed status table.
#[derive(Default)]
pub struct StaticProbe {
    statuses: Mutex<HashMap<String, ChannelStatus>>,
}

impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, key: &str, exists: bool, size_bytes: u64) {
        self.statuses.lock().unwrap().insert(
            key.to_string(),
            ChannelStatus { exists, size_bytes },
        );
    }
}

#[async_trait]
impl ChannelProbe for StaticProbe {
    async fn probe(&self, spec: &ChannelSpec) -> Result<ChannelStatus, TransportError> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(spec.key.as_str())
            .copied()
            .unwrap_or_default())
    }
}
