use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tailway_core::channel::ChannelKey;
use tailway_core::error::TransportError;
use tailway_core::transport::{Credential, StreamConnection, StreamTransport};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

enum ConnectPlan {
    Accept(UnboundedReceiver<Result<String, TransportError>>),
    Refuse(String),
}

/// Push transport answering `connect` from a queue of planned outcomes.
///
/// Each accepted connection is fed through the StreamHandle returned by
/// `expect_connection`; an unplanned connect is refused so a test fails
/// loudly instead of hanging.
#[derive(Default)]
pub struct FakeStreamTransport {
    plans: Mutex<VecDeque<ConnectPlan>>,
    probes: Arc<Mutex<Vec<String>>>,
    connects: Mutex<Vec<String>>,
}

/// Test-side handle to one planned connection.
pub struct StreamHandle {
    tx: UnboundedSender<Result<String, TransportError>>,
}

impl StreamHandle {
    /// Deliver a `log_line` frame carrying `record` as its payload.
    pub fn send_log_line(&self, record: Value) {
        self.send_raw(json!({ "event": "log_line", "record": record }).to_string());
    }

    /// Deliver an arbitrary raw message (malformed input, probe
    /// replies, unknown tags).
    pub fn send_raw(&self, raw: impl Into<String>) {
        let _ = self.tx.send(Ok(raw.into()));
    }

    /// Abnormal close: the connection surfaces a transport error.
    pub fn fail(&self, reason: &str) {
        let _ = self.tx.send(Err(TransportError::closed("fake", reason)));
    }

    /// Orderly close.
    pub fn close(self) {}
}

impl FakeStreamTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Plan one accepted connection and return its feed handle.
    pub fn expect_connection(&self) -> StreamHandle {
        let (tx, rx) = unbounded_channel();
        self.plans
            .lock()
            .unwrap()
            .push_back(ConnectPlan::Accept(rx));
        StreamHandle { tx }
    }

    /// Plan one refused connection attempt.
    pub fn expect_failure(&self, reason: &str) {
        self.plans
            .lock()
            .unwrap()
            .push_back(ConnectPlan::Refuse(reason.to_string()));
    }

    /// Keepalive probes observed across all connections, in order.
    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }

    /// Channels connected to, in order.
    pub fn connects(&self) -> Vec<String> {
        self.connects.lock().unwrap().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().unwrap().len()
    }
}

struct FakeConnection {
    rx: UnboundedReceiver<Result<String, TransportError>>,
    probes: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl StreamConnection for FakeConnection {
    async fn next_message(&mut self) -> Option<Result<String, TransportError>> {
        self.rx.recv().await
    }

    async fn send_probe(&mut self, probe: &str) -> Result<(), TransportError> {
        self.probes.lock().unwrap().push(probe.to_string());
        Ok(())
    }
}

#[async_trait]
impl StreamTransport for FakeStreamTransport {
    async fn connect(
        &self,
        channel: &ChannelKey,
        _credential: &Credential,
    ) -> Result<Box<dyn StreamConnection>, TransportError> {
        self.connects.lock().unwrap().push(channel.to_string());

        let plan = self.plans.lock().unwrap().pop_front();
        match plan {
            Some(ConnectPlan::Accept(rx)) => Ok(Box::new(FakeConnection {
                rx,
                probes: Arc::clone(&self.probes),
            })),
            Some(ConnectPlan::Refuse(reason)) => {
                Err(TransportError::connect(channel.to_string(), reason))
            }
            None => Err(TransportError::connect(
                channel.to_string(),
                "no connection planned",
            )),
        }
    }
}
