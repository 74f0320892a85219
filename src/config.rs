//! Scheduler configuration.

use serde::{Deserialize, Serialize};

use crate::error::{LogixError, LogixResult};

/// Tunables for [`Scheduler`](crate::scheduler::Scheduler).
///
/// Every field has a default, so a partial JSON object (or `{}`) is a
/// valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Drain/Propagate passes allowed within one tick before the cascade
    /// is treated as runaway and deferred to the next tick.
    pub max_delta_iterations: u32,
    /// Diagnostics retained; the oldest are dropped first.
    pub max_diagnostics: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            max_delta_iterations: 1000,
            max_diagnostics: 256,
        }
    }
}

impl SchedulerConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(text: &str) -> LogixResult<Self> {
        let config: SchedulerConfig =
            serde_json::from_str(text).map_err(|e| LogixError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LogixResult<()> {
        if self.max_delta_iterations == 0 {
            return Err(LogixError::InvalidConfig(
                "max_delta_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
