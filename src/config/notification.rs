use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Controls how envelopes fan out to listeners
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotificationConfig {
    /// Listeners invoked concurrently per dispatch. 1 means a plain sequential loop.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Start with delivery suspended, e.g. on a passive cluster member
    #[serde(default)]
    pub start_suspended: bool,

    /// Envelopes buffered per channel-backed subscription before new ones are dropped
    #[serde(default = "default_subscription_capacity")]
    pub subscription_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            start_suspended: false,
            subscription_capacity: default_subscription_capacity(),
        }
    }
}

impl NotificationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.parallelism == 0 {
            return Err(Error::Config(ConfigError::Message(
                "notification.parallelism must be at least 1".into(),
            )));
        }
        if self.subscription_capacity == 0 {
            return Err(Error::Config(ConfigError::Message(
                "notification.subscription_capacity must be at least 1".into(),
            )));
        }
        Ok(())
    }
}

fn default_parallelism() -> usize {
    1
}

fn default_subscription_capacity() -> usize {
    1024
}
