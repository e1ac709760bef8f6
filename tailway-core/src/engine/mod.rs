use crate::buffer::RecordWindow;
use crate::channel::{ChannelKey, ChannelRegistry, ChannelSpec, LogChannel};
use crate::config::EngineConfig;
use crate::error::{ConfigError, FetchError, TransportError};
use crate::filter::{FilterController, FilterCriteria, LevelFilter};
use crate::record::{InboundFrame, LogLevel, LogRecord, parse_frame};
use crate::session::{SessionId, SessionState, StreamSession};
use crate::transport::{
    ChannelProbe, Credential, ProducerLevelControl, SnapshotSource, StreamTransport,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info, trace, warn};

/// What one `tick` ended up processing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProcessedEvent {
    Snapshot,
    StreamOpened,
    StreamFrame,
    StreamClosed,
}

/// Discrete inputs the engine processes to completion, one at a time.
#[derive(Debug)]
pub enum EngineEvent {
    SnapshotResolved {
        generation: u64,
        outcome: Result<Vec<LogRecord>, FetchError>,
    },
    StreamOpened {
        session: SessionId,
    },
    StreamFrame {
        session: SessionId,
        raw: String,
    },
    StreamClosed {
        session: SessionId,
        cause: Option<TransportError>,
    },
}

/// The live log tailing engine behind one viewer instance.
///
/// Merges a bounded snapshot tail with a push stream into one ordered
/// record window, per channel, under filters that can change at any
/// moment. All state transitions run on the task that drives `tick`;
/// async results come back as tagged events and anything superseded by
/// a newer filter generation or session id is discarded on arrival.
pub struct LogEngine {
    cfg: EngineConfig,
    registry: ChannelRegistry,
    filters: FilterController,
    window: RecordWindow,
    active: Option<StreamSession>,
    snapshots: Arc<dyn SnapshotSource>,
    transport: Arc<dyn StreamTransport>,
    producer: Arc<dyn ProducerLevelControl>,
    credential: Credential,
    events_tx: UnboundedSender<EngineEvent>,
    events_rx: UnboundedReceiver<EngineEvent>,
    streaming_wanted: bool,
    live: bool,
    producer_levels: HashMap<String, LogLevel>,
    parse_failures: u64,
}

impl LogEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        taxonomy: Vec<ChannelSpec>,
        probe: Arc<dyn ChannelProbe>,
        snapshots: Arc<dyn SnapshotSource>,
        transport: Arc<dyn StreamTransport>,
        producer: Arc<dyn ProducerLevelControl>,
        credential: Credential,
        cfg: EngineConfig,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let initial_channel = taxonomy
            .first()
            .map(|spec| spec.key.clone())
            .ok_or(ConfigError::EmptyTaxonomy)?;

        let (events_tx, events_rx) = unbounded_channel();

        Ok(Self {
            window: RecordWindow::new(cfg.cap_max, cfg.cap_floor),
            registry: ChannelRegistry::new(taxonomy, probe),
            filters: FilterController::new(FilterCriteria::new(initial_channel)),
            active: None,
            snapshots,
            transport,
            producer,
            credential,
            events_tx,
            events_rx,
            streaming_wanted: false,
            live: false,
            producer_levels: HashMap::new(),
            parse_failures: 0,
            cfg,
        })
    }

    /// Load the channel list and issue the initial snapshot fetch.
    /// Called once per mount; the channel list is reference data after
    /// this.
    pub async fn init(&mut self) {
        self.registry.refresh().await;
        self.spawn_fetch();
    }

    // ---------------------------
    // User actions
    // ---------------------------

    /// Switch channels. A full channel switch clears the window before
    /// the new snapshot seeds it; unknown keys are ignored.
    pub fn set_channel(&mut self, channel: ChannelKey) {
        if self.registry.spec(&channel).is_none() {
            warn!(event = "unknown_channel", channel = %channel);
            return;
        }
        if self.filters.set_channel(channel) {
            self.restart(true, "channel_changed");
        }
    }

    pub fn set_level(&mut self, level: LevelFilter) {
        if self.filters.set_level(level) {
            self.restart(false, "level_changed");
        }
    }

    /// Stage search text. Nothing restarts until `apply_search`.
    pub fn stage_search(&mut self, text: impl Into<String>) {
        self.filters.stage_search(text);
    }

    pub fn apply_search(&mut self) {
        if self.filters.apply_search() {
            self.restart(false, "search_applied");
        }
    }

    /// Turn the live stream on. The window is not refetched or cleared;
    /// the new session simply appends behind whatever is already there.
    pub fn enable_streaming(&mut self) {
        self.streaming_wanted = true;
        if self.active.is_none() {
            self.open_session();
        }
    }

    /// Turn the live stream off. Idempotent: disabling twice produces
    /// no error and no duplicate side effects.
    pub fn disable_streaming(&mut self) {
        self.streaming_wanted = false;
        self.close_session("disabled");
    }

    /// Empty the window. An open session keeps delivering into it.
    pub fn clear(&mut self) {
        self.window.clear();
    }

    /// Adjust the producer's verbosity for one component. On an
    /// acknowledged change the displayed level is refreshed from a
    /// status read; a rejected change leaves it untouched.
    pub async fn set_producer_level(
        &mut self,
        component: &str,
        level: LogLevel,
    ) -> Result<(), ConfigError> {
        self.producer.set_level(component, level).await?;

        match self.producer.current_level(component).await {
            Ok(Some(confirmed)) => {
                self.producer_levels.insert(component.to_string(), confirmed);
            }
            Ok(None) => {
                self.producer_levels.remove(component);
            }
            Err(err) => {
                warn!(event = "producer_level_status_failed", component, error = %err);
            }
        }
        Ok(())
    }

    // ---------------------------
    // Read side
    // ---------------------------

    /// Ordered snapshot of the window for the presentation layer.
    pub fn view(&self) -> impl ExactSizeIterator<Item = &LogRecord> + '_ {
        self.window.view()
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Last-known channel metadata, taxonomy order.
    pub fn channels(&self) -> Vec<LogChannel> {
        self.registry.list()
    }

    pub async fn refresh_channels(&self) -> Vec<LogChannel> {
        self.registry.refresh().await
    }

    pub fn current_filter(&self) -> Arc<FilterCriteria> {
        self.filters.current()
    }

    pub fn staged_search(&self) -> &str {
        self.filters.staged_search()
    }

    /// Generation of the criteria in force; bumped by every applied
    /// filter change.
    pub fn filter_generation(&self) -> u64 {
        self.filters.generation()
    }

    /// Whether an open session is currently delivering.
    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn session_state(&self) -> SessionState {
        self.active
            .as_ref()
            .map(|s| s.state())
            .unwrap_or(SessionState::Idle)
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.active.as_ref().map(|s| s.id())
    }

    /// Level last confirmed by the producer for a component, if any.
    pub fn producer_level(&self, component: &str) -> Option<LogLevel> {
        self.producer_levels.get(component).copied()
    }

    /// Malformed inbound frames dropped so far. Diagnostics only; never
    /// surfaced per item.
    pub fn parse_failures(&self) -> u64 {
        self.parse_failures
    }

    // ---------------------------
    // Event pump
    // ---------------------------

    /// Wait for and process the next pending event. Returns what kind
    /// of event was handled so callers can drive the pump
    /// deterministically.
    pub async fn tick(&mut self) -> Option<ProcessedEvent> {
        let event = self.events_rx.recv().await?;
        Some(self.handle_event(event))
    }

    /// Process everything already queued without waiting.
    pub fn drain_pending(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: EngineEvent) -> ProcessedEvent {
        match event {
            EngineEvent::SnapshotResolved {
                generation,
                outcome,
            } => {
                self.on_snapshot(generation, outcome);
                ProcessedEvent::Snapshot
            }
            EngineEvent::StreamOpened { session } => {
                self.on_stream_opened(session);
                ProcessedEvent::StreamOpened
            }
            EngineEvent::StreamFrame { session, raw } => {
                self.on_stream_frame(session, &raw);
                ProcessedEvent::StreamFrame
            }
            EngineEvent::StreamClosed { session, cause } => {
                self.on_stream_closed(session, cause);
                ProcessedEvent::StreamClosed
            }
        }
    }

    fn on_snapshot(&mut self, generation: u64, outcome: Result<Vec<LogRecord>, FetchError>) {
        if generation != self.filters.generation() {
            debug!(
                event = "stale_snapshot_discarded",
                resolved = generation,
                current = self.filters.generation()
            );
            return;
        }

        match outcome {
            Ok(records) => {
                debug!(event = "snapshot_seeded", count = records.len());
                self.window.seed(records);
            }
            Err(err) => {
                // Non-fatal: no new records, previous contents retained.
                warn!(event = "snapshot_failed", error = %err);
            }
        }
    }

    fn on_stream_opened(&mut self, session: SessionId) {
        let Some(active) = self.active.as_mut().filter(|s| s.id() == session) else {
            trace!(event = "stale_stream_opened", session = %session);
            return;
        };
        active.mark_open();
        self.live = true;
    }

    fn on_stream_frame(&mut self, session: SessionId, raw: &str) {
        if self.active.as_ref().map(|s| s.id()) != Some(session) {
            trace!(event = "stale_stream_frame", session = %session);
            return;
        }

        let frame = match parse_frame(raw) {
            Ok(frame) => frame,
            Err(err) => {
                self.parse_failures += 1;
                trace!(event = "frame_dropped", error = %err);
                return;
            }
        };

        if let InboundFrame::LogLine(record) = frame {
            // The transport cannot narrow an open connection, so the
            // *current* criteria are applied here.
            if self.filters.current().matches(&record) {
                self.window.append(record, session);
            }
        }
    }

    fn on_stream_closed(&mut self, session: SessionId, cause: Option<TransportError>) {
        let Some(mut closed) = self.active.take_if(|s| s.id() == session) else {
            trace!(event = "stale_stream_closed", session = %session);
            return;
        };

        if let Some(err) = &cause {
            warn!(event = "stream_lost", session = %session, error = %err);
        } else {
            info!(event = "stream_ended", session = %session);
        }

        // No automatic reconnect: the stream stays down until the user
        // re-enables it or a filter change re-triggers a session.
        closed.mark_closed(if cause.is_some() {
            "transport_error"
        } else {
            "transport_closed"
        });
        self.window.set_active_session(None);
        self.live = false;
    }

    // ---------------------------
    // Restart plumbing
    // ---------------------------

    /// Handle a filter trigger. Teardown (generation bump, session
    /// close, keepalive cancel) completes synchronously before the
    /// replacement fetch and session are started.
    fn restart(&mut self, clear_window: bool, reason: &'static str) {
        self.close_session(reason);
        if clear_window {
            self.window.clear();
        }
        self.spawn_fetch();
        if self.streaming_wanted {
            self.open_session();
        }
    }

    fn close_session(&mut self, reason: &'static str) {
        if let Some(mut session) = self.active.take() {
            session.close(reason);
        }
        self.window.set_active_session(None);
        self.live = false;
    }

    fn open_session(&mut self) {
        // The prior session must be fully closed before a replacement
        // exists; two sessions never deliver into one window.
        self.close_session("replaced");

        let filter = self.filters.current();
        let session = StreamSession::open(
            Arc::clone(&self.transport),
            filter.channel.clone(),
            self.credential.clone(),
            filter,
            self.cfg.keepalive_interval,
            self.events_tx.clone(),
        );
        self.window.set_active_session(Some(session.id()));
        self.active = Some(session);
    }

    fn spawn_fetch(&mut self) {
        let generation = self.filters.generation();
        let filter = self.filters.current();
        let snapshots = Arc::clone(&self.snapshots);
        let limit = self.cfg.snapshot_limit;
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            let outcome = snapshots.fetch(&filter.channel, &filter, limit).await;
            let _ = events.send(EngineEvent::SnapshotResolved {
                generation,
                outcome,
            });
        });
    }
}

impl Drop for LogEngine {
    fn drop(&mut self) {
        self.close_session("unmounted");
    }
}
