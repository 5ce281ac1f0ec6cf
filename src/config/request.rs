use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Deadlines and batching for correlated request/response traffic
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RequestConfig {
    /// Deadline for a single request
    #[serde(default = "default_request_timeout")]
    pub timeout_in_ms: u64,

    /// Total budget shared by every round trip of one tree walk
    #[serde(default = "default_walk_budget")]
    pub walk_budget_in_ms: u64,

    /// Entries requested per identifier in a bulk "next" fetch
    #[serde(default = "default_max_repetitions")]
    pub max_repetitions: u32,

    /// Concurrency for batch attribute reads and writes
    #[serde(default = "default_batch_parallelism")]
    pub batch_parallelism: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_in_ms: default_request_timeout(),
            walk_budget_in_ms: default_walk_budget(),
            max_repetitions: default_max_repetitions(),
            batch_parallelism: default_batch_parallelism(),
        }
    }
}

impl RequestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "request.timeout_in_ms must be greater than 0".into(),
            )));
        }

        if self.walk_budget_in_ms < self.timeout_in_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "request.walk_budget_in_ms ({}) must not be shorter than a single request ({})",
                self.walk_budget_in_ms, self.timeout_in_ms
            ))));
        }

        if self.max_repetitions == 0 {
            return Err(Error::Config(ConfigError::Message(
                "request.max_repetitions must be at least 1".into(),
            )));
        }

        if self.batch_parallelism == 0 {
            return Err(Error::Config(ConfigError::Message(
                "request.batch_parallelism must be at least 1".into(),
            )));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_in_ms)
    }

    pub fn walk_budget(&self) -> Duration {
        Duration::from_millis(self.walk_budget_in_ms)
    }
}

fn default_request_timeout() -> u64 {
    5000
}
fn default_walk_budget() -> u64 {
    30_000
}
fn default_max_repetitions() -> u32 {
    10
}
fn default_batch_parallelism() -> usize {
    4
}
