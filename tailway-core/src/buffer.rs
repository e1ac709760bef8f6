use crate::record::LogRecord;
use crate::session::SessionId;
use std::collections::VecDeque;
use tracing::{debug, trace};

/// The bounded, ordered, in-memory record window behind the viewer.
///
/// Writes come from exactly one place at a time: the one-time seed of a
/// snapshot, then appends from the single open session. The window
/// enforces the session binding itself: an append tagged with anything
/// but the active session id is dropped, which is what stops a torn-down
/// session's late deliveries from landing in a buffer that has moved on.
pub struct RecordWindow {
    records: VecDeque<LogRecord>,
    cap_max: usize,
    cap_floor: usize,
    active_session: Option<SessionId>,
}

impl RecordWindow {
    /// `cap_floor` must be below `cap_max`; the engine validates this at
    /// construction.
    pub fn new(cap_max: usize, cap_floor: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(cap_floor.min(cap_max)),
            cap_max,
            cap_floor,
            active_session: None,
        }
    }

    /// Bind appends to one session. `None` between sessions.
    pub fn set_active_session(&mut self, session: Option<SessionId>) {
        self.active_session = session;
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.active_session
    }

    /// Replace the contents with a snapshot tail, oldest first.
    pub fn seed(&mut self, records: Vec<LogRecord>) {
        self.records = VecDeque::from(records);
        // A snapshot larger than the cap keeps its newest records.
        if self.records.len() > self.cap_max {
            let excess = self.records.len() - self.cap_max;
            self.records.drain(..excess);
        }
    }

    /// Append one live record, if it carries the active session's id.
    ///
    /// When the append would exceed `cap_max`, the oldest records are
    /// evicted in a single batch down to `cap_floor` first; the window
    /// never trims one record at a time.
    pub fn append(&mut self, record: LogRecord, session: SessionId) -> bool {
        if self.active_session != Some(session) {
            trace!(event = "stale_append_dropped", session = %session);
            return false;
        }

        if self.records.len() >= self.cap_max {
            let evicted = self.records.len() - self.cap_floor;
            self.records.drain(..evicted);
            debug!(event = "window_evicted", count = evicted, floor = self.cap_floor);
        }

        self.records.push_back(record);
        true
    }

    /// Ordered read-only view for the presentation layer.
    pub fn view(&self) -> impl ExactSizeIterator<Item = &LogRecord> + '_ {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Empty the window. Does not touch the session binding: an open
    /// session's subsequent deliveries simply repopulate it.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LogRecord;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn record(message: &str) -> LogRecord {
        LogRecord {
            timestamp: Utc::now(),
            level: None,
            source_tag: "test".to_string(),
            message: message.to_string(),
            extra: None,
        }
    }

    fn messages(window: &RecordWindow) -> Vec<String> {
        window.view().map(|r| r.message.clone()).collect()
    }

    #[test]
    fn seed_then_append_keeps_strict_order() {
        let mut window = RecordWindow::new(10, 5);
        let session = SessionId::new();
        window.set_active_session(Some(session));

        window.seed(vec![record("s1"), record("s2"), record("s3")]);
        assert!(window.append(record("r1"), session));
        assert!(window.append(record("r2"), session));

        assert_eq!(messages(&window), ["s1", "s2", "s3", "r1", "r2"]);
    }

    #[test]
    fn appends_from_other_sessions_are_dropped() {
        let mut window = RecordWindow::new(10, 5);
        let active = SessionId::new();
        let stale = SessionId::new();
        window.set_active_session(Some(active));

        assert!(!window.append(record("stale"), stale));
        assert!(window.is_empty());

        window.set_active_session(None);
        assert!(!window.append(record("orphan"), active));
        assert!(window.is_empty());
    }

    #[test]
    fn eviction_trims_to_floor_in_one_batch() {
        let mut window = RecordWindow::new(6, 3);
        let session = SessionId::new();
        window.set_active_session(Some(session));

        for i in 0..6 {
            window.append(record(&format!("m{i}")), session);
        }
        assert_eq!(window.len(), 6);

        // The seventh append triggers one batch eviction to the floor.
        window.append(record("m6"), session);
        assert_eq!(messages(&window), ["m3", "m4", "m5", "m6"]);
    }

    #[test]
    fn capacity_bound_holds_under_stress() {
        let cap_max = 2000;
        let cap_floor = 1500;
        let mut window = RecordWindow::new(cap_max, cap_floor);
        let session = SessionId::new();
        window.set_active_session(Some(session));

        for i in 0..2100 {
            window.append(record(&format!("m{i}")), session);
            assert!(window.len() <= cap_max);
        }

        // One full eviction batch of (cap_max - cap_floor) records.
        assert_eq!(window.len(), 2100 - (cap_max - cap_floor));
        assert_eq!(window.view().next().unwrap().message, "m500");
        assert_eq!(window.view().last().unwrap().message, "m2099");
    }

    #[test]
    fn oversized_seed_keeps_the_newest_records() {
        let mut window = RecordWindow::new(4, 2);
        window.seed((0..6).map(|i| record(&format!("m{i}"))).collect());

        assert_eq!(messages(&window), ["m2", "m3", "m4", "m5"]);
    }

    #[test]
    fn clear_empties_but_keeps_the_session_binding() {
        let mut window = RecordWindow::new(10, 5);
        let session = SessionId::new();
        window.set_active_session(Some(session));

        window.seed(vec![record("s1")]);
        window.clear();
        assert!(window.is_empty());

        // The open session keeps delivering into the cleared window.
        assert!(window.append(record("r1"), session));
        assert_eq!(messages(&window), ["r1"]);
    }
}
