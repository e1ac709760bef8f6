use crate::channel::ChannelKey;
use crate::record::{LogLevel, LogRecord};
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Client-side severity filter: a single level or everything.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LevelFilter {
    All,
    Level(LogLevel),
}

impl LevelFilter {
    pub fn accepts(&self, level: Option<LogLevel>) -> bool {
        match self {
            LevelFilter::All => true,
            LevelFilter::Level(wanted) => level == Some(*wanted),
        }
    }
}

/// Immutable filter value. Every mutation on the controller produces a
/// fresh instance; nothing ever edits one in place.
#[derive(Debug, Clone)]
pub struct FilterCriteria {
    pub channel: ChannelKey,
    pub level: LevelFilter,
    pub search_text: String,
}

impl FilterCriteria {
    pub fn new(channel: ChannelKey) -> Self {
        Self {
            channel,
            level: LevelFilter::All,
            search_text: String::new(),
        }
    }

    /// Whether a record passes this filter.
    ///
    /// Applied client-side on live records because the transport cannot
    /// narrow an already-open connection. Search is case-insensitive
    /// over message, source tag, and level name.
    pub fn matches(&self, record: &LogRecord) -> bool {
        if !self.level.accepts(record.level) {
            return false;
        }

        if self.search_text.is_empty() {
            return true;
        }

        let needle = self.search_text.to_lowercase();
        let level_name = record.level.map(|l| l.as_str()).unwrap_or_default();

        record.message.to_lowercase().contains(&needle)
            || record.source_tag.to_lowercase().contains(&needle)
            || level_name.to_lowercase().contains(&needle)
    }
}

/// Owns the current criteria and the generation counter that stamps
/// every downstream fetch and session.
///
/// Channel and level changes take effect immediately. Search text is
/// only staged by `stage_search` and takes effect on `apply_search`,
/// so typing a search never refetches per keystroke.
pub struct FilterController {
    current: ArcSwap<FilterCriteria>,
    generation: AtomicU64,
    staged_search: String,
}

impl FilterController {
    pub fn new(initial: FilterCriteria) -> Self {
        let staged_search = initial.search_text.clone();
        Self {
            current: ArcSwap::from_pointee(initial),
            generation: AtomicU64::new(1),
            staged_search,
        }
    }

    /// The criteria in force. Lock-free; safe to call from the
    /// presentation layer while the engine is mid-restart.
    pub fn current(&self) -> Arc<FilterCriteria> {
        self.current.load_full()
    }

    /// Marker identifying the criteria instance in force. Incremented on
    /// every applied change; stale async results compare against it.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Switch channels. Returns false (no trigger) if the key is
    /// unchanged, so repeated clicks do not storm the fetcher.
    pub fn set_channel(&mut self, channel: ChannelKey) -> bool {
        if self.current.load().channel == channel {
            return false;
        }
        self.apply(|c| c.channel = channel);
        true
    }

    pub fn set_level(&mut self, level: LevelFilter) -> bool {
        if self.current.load().level == level {
            return false;
        }
        self.apply(|c| c.level = level);
        true
    }

    /// Stage search text without triggering anything.
    pub fn stage_search(&mut self, text: impl Into<String>) {
        self.staged_search = text.into();
    }

    pub fn staged_search(&self) -> &str {
        &self.staged_search
    }

    /// Commit the staged search text. Returns false if it already
    /// matches the applied criteria.
    pub fn apply_search(&mut self) -> bool {
        if self.current.load().search_text == self.staged_search {
            return false;
        }
        let staged = self.staged_search.clone();
        self.apply(|c| c.search_text = staged);
        true
    }

    fn apply(&mut self, mutate: impl FnOnce(&mut FilterCriteria)) {
        let mut next = FilterCriteria::clone(&self.current.load());
        mutate(&mut next);
        self.current.store(Arc::new(next));
        self.generation.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(level: Option<LogLevel>, source: &str, message: &str) -> LogRecord {
        LogRecord {
            timestamp: Utc::now(),
            level,
            source_tag: source.to_string(),
            message: message.to_string(),
            extra: None,
        }
    }

    #[test]
    fn level_filter_drops_mismatches() {
        let mut criteria = FilterCriteria::new(ChannelKey::new("backend"));
        criteria.level = LevelFilter::Level(LogLevel::Error);

        assert!(criteria.matches(&record(Some(LogLevel::Error), "app", "boom")));
        assert!(!criteria.matches(&record(Some(LogLevel::Info), "app", "fine")));
        assert!(!criteria.matches(&record(None, "app", "unlevelled")));
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let mut criteria = FilterCriteria::new(ChannelKey::new("backend"));
        criteria.search_text = "TimeOut".to_string();

        assert!(criteria.matches(&record(None, "app", "upstream timeout reached")));
        assert!(criteria.matches(&record(None, "timeout.watchdog", "tick")));
        assert!(!criteria.matches(&record(Some(LogLevel::Info), "app", "all good")));
    }

    #[test]
    fn search_can_match_the_level_name() {
        let mut criteria = FilterCriteria::new(ChannelKey::new("backend"));
        criteria.search_text = "critical".to_string();

        assert!(criteria.matches(&record(Some(LogLevel::Critical), "app", "down")));
    }

    #[test]
    fn channel_and_level_changes_bump_the_generation() {
        let mut ctl = FilterController::new(FilterCriteria::new(ChannelKey::new("backend")));
        let g0 = ctl.generation();

        assert!(ctl.set_level(LevelFilter::Level(LogLevel::Error)));
        assert!(ctl.set_channel(ChannelKey::new("worker")));
        assert_eq!(ctl.generation(), g0 + 2);
    }

    #[test]
    fn unchanged_values_do_not_trigger() {
        let mut ctl = FilterController::new(FilterCriteria::new(ChannelKey::new("backend")));
        let g0 = ctl.generation();

        assert!(!ctl.set_channel(ChannelKey::new("backend")));
        assert!(!ctl.set_level(LevelFilter::All));
        assert_eq!(ctl.generation(), g0);
    }

    #[test]
    fn staged_search_only_applies_on_request() {
        let mut ctl = FilterController::new(FilterCriteria::new(ChannelKey::new("backend")));
        let g0 = ctl.generation();

        ctl.stage_search("timeout");
        ctl.stage_search("timeout abc");
        assert_eq!(ctl.current().search_text, "");
        assert_eq!(ctl.generation(), g0);

        assert!(ctl.apply_search());
        assert_eq!(ctl.current().search_text, "timeout abc");
        assert_eq!(ctl.generation(), g0 + 1);

        // Re-applying identical text is a no-op.
        assert!(!ctl.apply_search());
        assert_eq!(ctl.generation(), g0 + 1);
    }

    #[test]
    fn each_change_produces_a_distinct_instance() {
        let mut ctl = FilterController::new(FilterCriteria::new(ChannelKey::new("backend")));
        let before = ctl.current();
        ctl.set_level(LevelFilter::Level(LogLevel::Warning));
        let after = ctl.current();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.level, LevelFilter::All);
    }
}
