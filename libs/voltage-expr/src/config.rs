//! Expression configuration

use crate::date::NANOS_PER_SECOND;
use crate::error::{ExprError, Result};
use crate::state::DEFAULT_HISTORY_LIMIT;
use serde::{Deserialize, Serialize};

/// Limits applied to every stateful token of an expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionConfig {
    /// Maximum samples retained by any one history
    pub history_limit: usize,

    /// Granularity of synchronization keys, in nanoseconds
    pub synch_resolution_ns: i64,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            synch_resolution_ns: NANOS_PER_SECOND,
        }
    }
}

impl ExpressionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.history_limit == 0 {
            return Err(ExprError::config("history_limit must be at least 1"));
        }
        if self.synch_resolution_ns <= 0 {
            return Err(ExprError::config(format!(
                "synch_resolution_ns must be positive, got {}",
                self.synch_resolution_ns
            )));
        }
        Ok(())
    }
}
