use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;

#[cfg(test)]
use mockall::automock;
use serde::Serialize;

use crate::FeatureValue;

/// Immutable notification as delivered to listeners
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationEnvelope {
    pub category: String,
    /// Resource the notification originated from
    pub source: String,
    pub sequence: u64,
    pub timestamp: SystemTime,
    pub message: String,
    pub payload: FeatureValue,
}

/// Source of envelope sequence numbers.
///
/// Injected so that several connectors (or a cluster) can share one counter.
#[cfg_attr(test, automock)]
pub trait SequenceGenerator: Send + Sync + 'static {
    fn next(&self) -> u64;
}

/// Process-local monotonic counter, starting at 1
#[derive(Debug, Default)]
pub struct LocalSequence {
    last: AtomicU64,
}

impl LocalSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }
}

impl SequenceGenerator for LocalSequence {
    fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }
}
