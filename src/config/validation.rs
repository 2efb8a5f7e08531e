//! Coupon validation tuning

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Upper bound on evaluator workers per request.
pub const MAX_WORKERS_LIMIT: usize = 64;

/// Settings for the validate-and-consume path.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    /// End-to-end deadline for one validation, in milliseconds
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,

    /// Discount evaluator worker cap per request
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Cache coupon metadata in memory
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,
}

impl ValidationConfig {
    /// Get the validation deadline as Duration
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    /// Validate against the outer request timeout.
    pub fn validate(&self, request_timeout: Duration) -> Result<(), ValidationError> {
        if self.deadline_ms == 0 || self.deadline() > request_timeout {
            return Err(ValidationError::InvalidDeadline);
        }
        if self.max_workers == 0 || self.max_workers > MAX_WORKERS_LIMIT {
            return Err(ValidationError::InvalidWorkerCount {
                max: MAX_WORKERS_LIMIT,
            });
        }
        Ok(())
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            deadline_ms: default_deadline_ms(),
            max_workers: default_max_workers(),
            cache_enabled: default_cache_enabled(),
        }
    }
}

fn default_deadline_ms() -> u64 {
    8_000
}

fn default_max_workers() -> usize {
    4
}

fn default_cache_enabled() -> bool {
    true
}
