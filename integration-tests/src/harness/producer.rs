use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tailway_core::error::ConfigError;
use tailway_core::record::LogLevel;
use tailway_core::transport::ProducerLevelControl;

/// Producer-side level control with a scriptable server truth.
///
/// `set_level` never mutates the server levels itself; a test states
/// what the status read returns, so an engine that trusted the
/// requested value instead of the confirmed one is caught.
#[derive(Default)]
pub struct ScriptedProducer {
    server_levels: Mutex<HashMap<String, LogLevel>>,
    reject_reason: Mutex<Option<String>>,
    status_read_fails: Mutex<bool>,
    set_calls: Mutex<Vec<(String, LogLevel)>>,
}

impl ScriptedProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// What subsequent status reads report for `component`.
    pub fn set_server_level(&self, component: &str, level: LogLevel) {
        self.server_levels
            .lock()
            .unwrap()
            .insert(component.to_string(), level);
    }

    /// Make every following `set_level` call fail.
    pub fn reject_with(&self, reason: &str) {
        *self.reject_reason.lock().unwrap() = Some(reason.to_string());
    }

    pub fn fail_status_reads(&self) {
        *self.status_read_fails.lock().unwrap() = true;
    }

    pub fn set_calls(&self) -> Vec<(String, LogLevel)> {
        self.set_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProducerLevelControl for ScriptedProducer {
    async fn set_level(&self, component: &str, level: LogLevel) -> Result<(), ConfigError> {
        if let Some(reason) = self.reject_reason.lock().unwrap().clone() {
            return Err(ConfigError::level_rejected(component, reason));
        }
        self.set_calls
            .lock()
            .unwrap()
            .push((component.to_string(), level));
        Ok(())
    }

    async fn current_level(&self, component: &str) -> Result<Option<LogLevel>, ConfigError> {
        if *self.status_read_fails.lock().unwrap() {
            return Err(ConfigError::level_rejected(component, "status unavailable"));
        }
        Ok(self.server_levels.lock().unwrap().get(component).copied())
    }
}
