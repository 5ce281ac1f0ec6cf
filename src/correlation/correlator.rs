use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::trace;

use crate::metrics::REQUEST_TIMEOUTS;
use crate::Error;
use crate::Result;

/// Completion callback handed to a send-with-callback primitive. Invoke at most once.
pub type ResponseCallback<T> = Box<dyn FnOnce(Result<T>) + Send + 'static>;

/// Matches asynchronous responses to the requests waiting for them.
///
/// A request is pending while its id is in the map. Whoever removes the id
/// first decides the terminal state: the callback (completed or failed) or
/// the deadline (timed out). Anything arriving afterwards is ignored.
pub struct RequestCorrelator<T> {
    pending: DashMap<u64, oneshot::Sender<Result<T>>>,
    next_id: AtomicU64,
}

impl<T: Send + 'static> RequestCorrelator<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pending: DashMap::new(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Sends through `send` and waits for its callback, at most `deadline`.
    ///
    /// A zero deadline fails immediately without sending.
    pub async fn call<S>(
        self: &Arc<Self>,
        operation: &str,
        deadline: Duration,
        send: S,
    ) -> Result<T>
    where
        S: FnOnce(u64, ResponseCallback<T>) -> Result<()>,
    {
        if deadline.is_zero() {
            REQUEST_TIMEOUTS.with_label_values(&[operation]).inc();
            return Err(Error::timeout(operation, deadline));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        // forgets the id if the caller stops awaiting before a terminal state
        let _pending = PendingGuard {
            pending: &self.pending,
            id,
        };

        let correlator = Arc::downgrade(self);
        let callback: ResponseCallback<T> = Box::new(move |result| {
            if let Some(correlator) = correlator.upgrade() {
                correlator.complete(id, result);
            }
        });

        if let Err(e) = send(id, callback) {
            self.pending.remove(&id);
            debug!(request = id, operation, "Request failed before send: {}", e);
            return Err(e);
        }

        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::transport(format!("{operation}: request {id} abandoned"))),
            Err(_) => {
                self.pending.remove(&id);
                REQUEST_TIMEOUTS.with_label_values(&[operation]).inc();
                debug!(request = id, operation, ?deadline, "Request timed out");
                Err(Error::timeout(operation, deadline))
            }
        }
    }

    /// Delivers the outcome of request `id`. Returns `false` for a late or unknown id.
    pub fn complete(
        &self,
        id: u64,
        result: Result<T>,
    ) -> bool {
        match self.pending.remove(&id) {
            Some((_, tx)) => tx.send(result).is_ok(),
            None => {
                trace!(request = id, "Late response ignored");
                false
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

struct PendingGuard<'a, T> {
    pending: &'a DashMap<u64, oneshot::Sender<Result<T>>>,
    id: u64,
}

impl<T> Drop for PendingGuard<'_, T> {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}
