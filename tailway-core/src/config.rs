use crate::error::ConfigError;
use std::time::Duration;

pub const DEFAULT_CAP_MAX: usize = 2000;
pub const DEFAULT_CAP_FLOOR: usize = 1500;
pub const DEFAULT_SNAPSHOT_LIMIT: usize = 500;
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Tuning knobs for one engine instance.
///
/// The defaults match the values the log viewer shipped with; hosts that
/// embed the engine can override them per instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Hard upper bound on the record window length.
    pub cap_max: usize,
    /// Length the window is trimmed back to when `cap_max` would be
    /// exceeded. Eviction happens in one batch, oldest first.
    pub cap_floor: usize,
    /// Hard cap on the number of records requested per snapshot fetch.
    pub snapshot_limit: usize,
    /// Interval between keepalive probes on an open stream.
    pub keepalive_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cap_max: DEFAULT_CAP_MAX,
            cap_floor: DEFAULT_CAP_FLOOR,
            snapshot_limit: DEFAULT_SNAPSHOT_LIMIT,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cap_max == 0 {
            return Err(ConfigError::ZeroField { field: "cap_max" });
        }
        if self.snapshot_limit == 0 {
            return Err(ConfigError::ZeroField {
                field: "snapshot_limit",
            });
        }
        if self.keepalive_interval.is_zero() {
            return Err(ConfigError::ZeroField {
                field: "keepalive_interval",
            });
        }
        if self.cap_floor >= self.cap_max {
            return Err(ConfigError::CapacityBounds {
                floor: self.cap_floor,
                max: self.cap_max,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn floor_must_stay_below_cap() {
        let cfg = EngineConfig {
            cap_max: 100,
            cap_floor: 100,
            ..EngineConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::CapacityBounds { floor: 100, max: 100 })
        ));
    }

    #[test]
    fn zero_snapshot_limit_is_rejected() {
        let cfg = EngineConfig {
            snapshot_limit: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ZeroField {
                field: "snapshot_limit"
            })
        ));
    }
}
