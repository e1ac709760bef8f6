//! File-backed implementations of the engine's transport seams.
//!
//! Channels map onto JSON-lines log files under one directory, one
//! record object per line. The "live stream" is a polling follow of
//! file growth, wrapped into the same tagged frames the push transport
//! delivers, so the engine cannot tell the difference.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tailway_core::channel::{ChannelKey, ChannelSpec};
use tailway_core::error::{ConfigError, FetchError, TransportError};
use tailway_core::filter::FilterCriteria;
use tailway_core::record::{LogLevel, LogRecord, parse_record};
use tailway_core::transport::{
    ChannelProbe, ChannelStatus, Credential, ProducerLevelControl, SnapshotSource,
    StreamConnection, StreamTransport,
};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

fn channel_path(root: &Path, filename: &str) -> PathBuf {
    root.join(filename)
}

/// Reports a channel file's existence and size from fs metadata.
pub struct FileChannelProbe {
    root: PathBuf,
}

impl FileChannelProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ChannelProbe for FileChannelProbe {
    async fn probe(&self, spec: &ChannelSpec) -> Result<ChannelStatus, TransportError> {
        match tokio::fs::metadata(channel_path(&self.root, &spec.filename)).await {
            Ok(meta) => Ok(ChannelStatus {
                exists: true,
                size_bytes: meta.len(),
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(ChannelStatus::default())
            }
            Err(err) => Err(TransportError::Unreachable {
                channel: spec.key.to_string(),
                reason: err.to_string(),
            }),
        }
    }
}

/// Bounded historical tail of a channel file, filtered server-side the
/// way the dashboard's snapshot endpoint would filter.
pub struct FileSnapshotSource {
    root: PathBuf,
}

impl FileSnapshotSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn filename_for(&self, channel: &ChannelKey) -> PathBuf {
        // Channel keys double as file stems when no taxonomy row is at
        // hand; the CLI always passes taxonomy-backed keys.
        channel_path(&self.root, &format!("{channel}.log"))
    }
}

#[async_trait]
impl SnapshotSource for FileSnapshotSource {
    async fn fetch(
        &self,
        channel: &ChannelKey,
        filter: &FilterCriteria,
        limit: usize,
    ) -> Result<Vec<LogRecord>, FetchError> {
        let path = self.filename_for(channel);
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| FetchError::query(channel.to_string(), err.to_string()))?;

        let mut records: Vec<LogRecord> = contents
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .map(|value| parse_record(&value))
            .filter(|record| filter.matches(record))
            .collect();

        if records.len() > limit {
            records.drain(..records.len() - limit);
        }
        Ok(records)
    }
}

/// Poll-based follow of a channel file.
pub struct FileStreamTransport {
    root: PathBuf,
    poll_interval: Duration,
}

impl FileStreamTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

#[async_trait]
impl StreamTransport for FileStreamTransport {
    async fn connect(
        &self,
        channel: &ChannelKey,
        _credential: &Credential,
    ) -> Result<Box<dyn StreamConnection>, TransportError> {
        let path = channel_path(&self.root, &format!("{channel}.log"));
        let offset = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(err) => {
                return Err(TransportError::connect(channel.to_string(), err.to_string()));
            }
        };

        Ok(Box::new(FileStreamConnection {
            path,
            offset,
            poll_interval: self.poll_interval,
            pending: Vec::new(),
        }))
    }
}

struct FileStreamConnection {
    path: PathBuf,
    /// Byte offset of the next unread position; only whole lines are
    /// consumed, so a partially-written line stays in the file.
    offset: u64,
    poll_interval: Duration,
    pending: Vec<String>,
}

impl FileStreamConnection {
    async fn poll_new_lines(&mut self) -> Result<(), TransportError> {
        let meta = tokio::fs::metadata(&self.path)
            .await
            .map_err(|err| TransportError::closed(self.path.display().to_string(), err.to_string()))?;

        let len = meta.len();
        if len < self.offset {
            // Truncated out from under us; restart from the new end.
            self.offset = len;
            return Ok(());
        }
        if len == self.offset {
            return Ok(());
        }

        let mut file = File::open(&self.path)
            .await
            .map_err(|err| TransportError::closed(self.path.display().to_string(), err.to_string()))?;
        file.seek(SeekFrom::Start(self.offset))
            .await
            .map_err(|err| TransportError::closed(self.path.display().to_string(), err.to_string()))?;

        let mut chunk = String::new();
        file.read_to_string(&mut chunk)
            .await
            .map_err(|err| TransportError::closed(self.path.display().to_string(), err.to_string()))?;

        let consumed = match chunk.rfind('\n') {
            Some(last_newline) => &chunk[..=last_newline],
            None => return Ok(()),
        };
        self.offset += consumed.len() as u64;

        for line in consumed.lines().filter(|l| !l.trim().is_empty()) {
            // Wrap the raw record into the tagged frame the engine
            // expects from the push transport.
            let frame = match serde_json::from_str::<Value>(line) {
                Ok(record) => json!({ "event": "log_line", "record": record }).to_string(),
                // Let the engine count the parse failure.
                Err(_) => line.to_string(),
            };
            self.pending.push(frame);
        }
        Ok(())
    }
}

#[async_trait]
impl StreamConnection for FileStreamConnection {
    async fn next_message(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            if !self.pending.is_empty() {
                return Some(Ok(self.pending.remove(0)));
            }
            if let Err(err) = self.poll_new_lines().await {
                return Some(Err(err));
            }
            if self.pending.is_empty() {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
    }

    async fn send_probe(&mut self, _probe: &str) -> Result<(), TransportError> {
        // Files have no peer to keep alive.
        Ok(())
    }
}

/// Files have no producer process to adjust.
pub struct FileProducerControl;

#[async_trait]
impl ProducerLevelControl for FileProducerControl {
    async fn set_level(&self, _component: &str, _level: LogLevel) -> Result<(), ConfigError> {
        Err(ConfigError::LevelControlUnsupported)
    }

    async fn current_level(&self, _component: &str) -> Result<Option<LogLevel>, ConfigError> {
        Ok(None)
    }
}
