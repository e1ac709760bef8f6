use std::sync::Arc;

/// Stable identifier for a log channel.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct ChannelKey(Arc<str>);

impl ChannelKey {
    pub fn new(s: impl Into<Arc<str>>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One row of the channel taxonomy table.
///
/// The set of viewable channels is data, not code: the engine is
/// parameterized by a list of these rows, so adding a channel is a table
/// entry rather than a new viewer variant.
#[derive(Debug, Clone)]
pub struct ChannelSpec {
    pub key: ChannelKey,
    pub filename: String,
    pub group_label: String,
}

impl ChannelSpec {
    pub fn new(
        key: impl Into<ChannelKey>,
        filename: impl Into<String>,
        group_label: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            filename: filename.into(),
            group_label: group_label.into(),
        }
    }
}

/// The channel set of the proxy service this dashboard fronts.
pub fn service_taxonomy() -> Vec<ChannelSpec> {
    vec![
        ChannelSpec::new("backend", "backend.log", "Application"),
        ChannelSpec::new("worker", "worker.log", "Application"),
        ChannelSpec::new("proxy-access", "proxy-access.log", "Proxy"),
        ChannelSpec::new("proxy-error", "proxy-error.log", "Proxy"),
        ChannelSpec::new("database", "database.log", "Infrastructure"),
    ]
}

/// Channel metadata as reported to the presentation layer.
#[derive(Debug, Clone)]
pub struct LogChannel {
    pub key: ChannelKey,
    pub filename: String,
    pub exists: bool,
    pub size_bytes: u64,
    pub group_label: String,
}
