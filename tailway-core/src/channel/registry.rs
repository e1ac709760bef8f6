use crate::channel::{ChannelKey, ChannelSpec, LogChannel};
use crate::transport::{ChannelProbe, ChannelStatus};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Read-only reference data about the available channels.
///
/// Listing is best-effort: a channel whose backing source cannot be
/// probed is reported with `exists = false, size_bytes = 0`, never an
/// error. The last probe result per channel is cached so the
/// presentation layer can read metadata without re-probing.
pub struct ChannelRegistry {
    taxonomy: Vec<ChannelSpec>,
    probe: Arc<dyn ChannelProbe>,
    cache: DashMap<ChannelKey, LogChannel>,
}

impl ChannelRegistry {
    pub fn new(taxonomy: Vec<ChannelSpec>, probe: Arc<dyn ChannelProbe>) -> Self {
        Self {
            taxonomy,
            probe,
            cache: DashMap::new(),
        }
    }

    pub fn taxonomy(&self) -> &[ChannelSpec] {
        &self.taxonomy
    }

    pub fn spec(&self, key: &ChannelKey) -> Option<&ChannelSpec> {
        self.taxonomy.iter().find(|spec| &spec.key == key)
    }

    /// Probe every channel and return the refreshed list in taxonomy
    /// order.
    pub async fn refresh(&self) -> Vec<LogChannel> {
        let mut channels = Vec::with_capacity(self.taxonomy.len());

        for spec in &self.taxonomy {
            let status = match self.probe.probe(spec).await {
                Ok(status) => status,
                Err(err) => {
                    debug!(
                        event = "channel_probe_failed",
                        channel = %spec.key,
                        error = %err
                    );
                    ChannelStatus::default()
                }
            };

            let channel = LogChannel {
                key: spec.key.clone(),
                filename: spec.filename.clone(),
                exists: status.exists,
                size_bytes: status.size_bytes,
                group_label: spec.group_label.clone(),
            };
            self.cache.insert(spec.key.clone(), channel.clone());
            channels.push(channel);
        }

        channels
    }

    /// Last-known metadata in taxonomy order; channels never probed are
    /// reported as absent.
    pub fn list(&self) -> Vec<LogChannel> {
        self.taxonomy
            .iter()
            .map(|spec| {
                self.cache
                    .get(&spec.key)
                    .map(|entry| entry.value().clone())
                    .unwrap_or_else(|| LogChannel {
                        key: spec.key.clone(),
                        filename: spec.filename.clone(),
                        exists: false,
                        size_bytes: 0,
                        group_label: spec.group_label.clone(),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::service_taxonomy;
    use crate::error::TransportError;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct MapProbe {
        statuses: HashMap<String, ChannelStatus>,
        failing: Vec<String>,
    }

    #[async_trait]
    impl ChannelProbe for MapProbe {
        async fn probe(&self, spec: &ChannelSpec) -> Result<ChannelStatus, TransportError> {
            if self.failing.contains(&spec.key.to_string()) {
                return Err(TransportError::Unreachable {
                    channel: spec.key.to_string(),
                    reason: "probe refused".to_string(),
                });
            }
            Ok(self
                .statuses
                .get(spec.key.as_str())
                .copied()
                .unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn unreachable_channels_are_reported_not_raised() {
        let probe = MapProbe {
            statuses: HashMap::from([(
                "backend".to_string(),
                ChannelStatus {
                    exists: true,
                    size_bytes: 4096,
                },
            )]),
            failing: vec!["database".to_string()],
        };
        let registry = ChannelRegistry::new(service_taxonomy(), Arc::new(probe));

        let channels = registry.refresh().await;
        assert_eq!(channels.len(), 5);

        let backend = &channels[0];
        assert!(backend.exists);
        assert_eq!(backend.size_bytes, 4096);

        let database = channels.iter().find(|c| c.key.as_str() == "database").unwrap();
        assert!(!database.exists);
        assert_eq!(database.size_bytes, 0);
    }

    #[tokio::test]
    async fn list_serves_cached_results_in_taxonomy_order() {
        let probe = MapProbe {
            statuses: HashMap::new(),
            failing: vec![],
        };
        let registry = ChannelRegistry::new(service_taxonomy(), Arc::new(probe));

        // Before any probe, everything is reported absent.
        let cold = registry.list();
        assert!(cold.iter().all(|c| !c.exists));

        registry.refresh().await;
        let keys: Vec<_> = registry.list().iter().map(|c| c.key.to_string()).collect();
        assert_eq!(
            keys,
            ["backend", "worker", "proxy-access", "proxy-error", "database"]
        );
    }
}
