mod guard;
mod state;

pub use guard::SessionGuard;
pub use state::SessionState;

use crate::channel::ChannelKey;
use crate::engine::EngineEvent;
use crate::filter::FilterCriteria;
use crate::transport::{Credential, KEEPALIVE_PROBE, StreamTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::info;
use uuid::Uuid;

/// Opaque id, unique per session instantiation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One live stream session, bound to exactly one (channel, filter) pair
/// for its whole life. Any change to either value invalidates it.
///
/// The connection and the keepalive timer live inside a spawned
/// forwarder task owned through a SessionGuard, so every teardown path
/// releases both.
pub struct StreamSession {
    id: SessionId,
    channel: ChannelKey,
    filter_at_creation: Arc<FilterCriteria>,
    state: SessionState,
    guard: Option<SessionGuard>,
}

impl StreamSession {
    /// Open a new session: spawns the forwarder task and enters
    /// `Connecting`. The credential is supplied by the caller, never
    /// read from ambient state.
    pub fn open(
        transport: Arc<dyn StreamTransport>,
        channel: ChannelKey,
        credential: Credential,
        filter: Arc<FilterCriteria>,
        keepalive_interval: Duration,
        events: UnboundedSender<EngineEvent>,
    ) -> Self {
        let id = SessionId::new();
        let handle = tokio::spawn(run_stream(
            transport,
            channel.clone(),
            credential,
            id,
            keepalive_interval,
            events,
        ));

        let mut session = Self {
            id,
            channel,
            filter_at_creation: filter,
            state: SessionState::Idle,
            guard: Some(SessionGuard::new_spawned(handle)),
        };
        session.transition(SessionState::Connecting, "enabled");
        session
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn channel(&self) -> &ChannelKey {
        &self.channel
    }

    pub fn filter_at_creation(&self) -> &Arc<FilterCriteria> {
        &self.filter_at_creation
    }

    /// Connection established; the session is ready to deliver. The
    /// record window is untouched by this transition.
    pub fn mark_open(&mut self) {
        if self.state == SessionState::Connecting {
            self.transition(SessionState::Open, "connected");
        }
    }

    /// Orderly teardown: disable, filter change, or drop.
    ///
    /// Idempotent: closing an already-closed session is a no-op. The
    /// guard is released on the way through `Closing`, cancelling the
    /// keepalive timer and the connection together.
    pub fn close(&mut self, reason: &'static str) {
        if self.state == SessionState::Closed {
            return;
        }
        self.transition(SessionState::Closing, reason);
        self.guard.take();
        self.transition(SessionState::Closed, reason);
    }

    /// Transport-driven close or error: straight to `Closed`.
    pub fn mark_closed(&mut self, reason: &'static str) {
        if self.state == SessionState::Closed {
            return;
        }
        self.guard.take();
        self.transition(SessionState::Closed, reason);
    }

    fn transition(&mut self, to: SessionState, reason: &'static str) {
        info!(
            event = "session_transition",
            session = %self.id,
            channel = %self.channel,
            from = ?self.state,
            to = ?to,
            reason
        );
        self.state = to;
    }
}

/// Forwarder task: connect, then pump inbound messages and keepalive
/// probes until the transport closes or the session guard aborts us.
///
/// Every event is tagged with the session id; the engine drops anything
/// tagged with a session that is no longer active.
async fn run_stream(
    transport: Arc<dyn StreamTransport>,
    channel: ChannelKey,
    credential: Credential,
    session: SessionId,
    keepalive_interval: Duration,
    events: UnboundedSender<EngineEvent>,
) {
    let mut conn = match transport.connect(&channel, &credential).await {
        Ok(conn) => conn,
        Err(err) => {
            let _ = events.send(EngineEvent::StreamClosed {
                session,
                cause: Some(err),
            });
            return;
        }
    };

    if events.send(EngineEvent::StreamOpened { session }).is_err() {
        return;
    }

    // First probe one full interval after open, not immediately.
    let mut keepalive = interval_at(
        Instant::now() + keepalive_interval,
        keepalive_interval,
    );
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = keepalive.tick() => {
                // A failed send is a transport error; a silent probe
                // (no reply) is not.
                if let Err(err) = conn.send_probe(KEEPALIVE_PROBE).await {
                    let _ = events.send(EngineEvent::StreamClosed {
                        session,
                        cause: Some(err),
                    });
                    return;
                }
            }

            message = conn.next_message() => match message {
                Some(Ok(raw)) => {
                    if events
                        .send(EngineEvent::StreamFrame { session, raw })
                        .is_err()
                    {
                        return;
                    }
                }
                Some(Err(err)) => {
                    let _ = events.send(EngineEvent::StreamClosed {
                        session,
                        cause: Some(err),
                    });
                    return;
                }
                None => {
                    let _ = events.send(EngineEvent::StreamClosed { session, cause: None });
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique_per_instantiation() {
        assert_ne!(SessionId::new(), SessionId::new());
    }
}
