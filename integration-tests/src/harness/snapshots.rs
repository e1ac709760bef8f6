use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tailway_core::channel::ChannelKey;
use tailway_core::error::FetchError;
use tailway_core::filter::FilterCriteria;
use tailway_core::record::LogRecord;
use tailway_core::transport::SnapshotSource;
use tokio::sync::Notify;

struct SnapshotPlan {
    outcome: Result<Vec<LogRecord>, String>,
    /// When set, the fetch blocks until the gate is notified; the
    /// handle for simulating a slow, superseded request.
    gate: Option<Arc<Notify>>,
}

/// Snapshot source answering from a queue of pre-planned responses,
/// consumed in fetch-call order. A fetch with no plan left resolves to
/// an empty snapshot.
#[derive(Default)]
pub struct ScriptedSnapshots {
    plans: Mutex<VecDeque<SnapshotPlan>>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl ScriptedSnapshots {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, records: Vec<LogRecord>) {
        self.plans.lock().unwrap().push_back(SnapshotPlan {
            outcome: Ok(records),
            gate: None,
        });
    }

    /// Plan a response that does not resolve until `gate` is notified.
    pub fn push_gated(&self, records: Vec<LogRecord>, gate: Arc<Notify>) {
        self.plans.lock().unwrap().push_back(SnapshotPlan {
            outcome: Ok(records),
            gate: Some(gate),
        });
    }

    pub fn push_error(&self, reason: &str) {
        self.plans.lock().unwrap().push_back(SnapshotPlan {
            outcome: Err(reason.to_string()),
            gate: None,
        });
    }

    /// (channel, limit) per fetch, in call order.
    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSnapshots {
    async fn fetch(
        &self,
        channel: &ChannelKey,
        _filter: &FilterCriteria,
        limit: usize,
    ) -> Result<Vec<LogRecord>, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((channel.to_string(), limit));

        let plan = self.plans.lock().unwrap().pop_front();
        let Some(plan) = plan else {
            return Ok(Vec::new());
        };

        if let Some(gate) = &plan.gate {
            gate.notified().await;
        }

        plan.outcome
            .map_err(|reason| FetchError::query(channel.to_string(), reason))
    }
}
