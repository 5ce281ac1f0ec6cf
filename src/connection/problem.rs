use std::fmt;
use std::time::Instant;

use parking_lot::Mutex;

/// Last reported connection failure
#[derive(Debug, Clone)]
pub struct ProblemRecord {
    pub reason: String,
    pub reported_at: Instant,
}

impl fmt::Display for ProblemRecord {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Single-slot holder for the last connection failure.
///
/// First reporter wins until the slot is cleared by a successful reconnection.
/// A non-empty slot means the watchdog repairs the session on its next tick.
#[derive(Debug, Default)]
pub struct ConnectionProblem {
    slot: Mutex<Option<ProblemRecord>>,
}

impl ConnectionProblem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this call filled the slot
    pub fn report(
        &self,
        reason: impl Into<String>,
    ) -> bool {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(ProblemRecord {
            reason: reason.into(),
            reported_at: Instant::now(),
        });
        true
    }

    pub fn get(&self) -> Option<ProblemRecord> {
        self.slot.lock().clone()
    }

    pub fn is_set(&self) -> bool {
        self.slot.lock().is_some()
    }

    pub fn clear(&self) -> Option<ProblemRecord> {
        self.slot.lock().take()
    }
}
