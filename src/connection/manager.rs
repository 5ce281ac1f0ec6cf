use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use super::watchdog;
use super::ConnectionProblem;
use super::ProblemRecord;
use super::ReconnectHandler;
use super::SessionFactory;
use crate::metrics::RECONNECT_HANDLER_FAILURES;
use crate::ConnectionConfig;
use crate::ConnectionError;
use crate::Error;
use crate::Result;

pub(crate) type HandlerList<S> = Vec<Arc<dyn ReconnectHandler<S>>>;

/// State shared between the manager and its watchdog task
pub(super) struct SessionState<F: SessionFactory> {
    pub(super) factory: F,
    pub(super) session: RwLock<Option<Arc<F::Session>>>,
    pub(super) problem: ConnectionProblem,
    pub(super) handlers: ArcSwap<HandlerList<F::Session>>,
    pub(super) closed: AtomicBool,
    /// Number of watchdog ticks that found a problem in the slot
    pub(super) observed: watch::Sender<u64>,
    pub(super) connect_timeout: Duration,
}

/// Owns the session to one remote endpoint and hides transient connectivity
/// loss from everything built on top of it.
///
/// # Locking
///
/// The session sits behind a reader/writer lock. Ordinary operations take a
/// read lease through [`with_session`](Self::with_session); reconnection
/// takes the write lease, so watchdog attempts never overlap and never race
/// an in-flight call.
pub struct ConnectionManager<F: SessionFactory> {
    state: Arc<SessionState<F>>,
    config: ConnectionConfig,
    shutdown_tx: watch::Sender<()>,
    watchdog: Mutex<Option<JoinHandle<()>>>,
}

impl<F: SessionFactory> ConnectionManager<F> {
    pub fn new(
        factory: F,
        config: ConnectionConfig,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(());
        let (observed, _) = watch::channel(0);
        let state = Arc::new(SessionState {
            factory,
            session: RwLock::new(None),
            problem: ConnectionProblem::new(),
            handlers: ArcSwap::from_pointee(Vec::new()),
            closed: AtomicBool::new(false),
            observed,
            connect_timeout: config.connect_timeout(),
        });

        Self {
            state,
            config,
            shutdown_tx,
            watchdog: Mutex::new(None),
        }
    }

    /// Establishes the initial session. Calling it again once connected is a no-op.
    ///
    /// Reconnect handlers run for this first session too. The watchdog is
    /// started after the first success.
    #[instrument(skip(self))]
    pub async fn connect(&self) -> Result<()> {
        self.ensure_open()?;

        let mut guard = self.state.session.write().await;
        if guard.is_some() {
            return Ok(());
        }

        let session = Arc::new(self.state.create_session().await?);
        *guard = Some(session.clone());
        self.state.run_handlers(&session).await;
        drop(guard);

        info!("Session established");
        self.start_watchdog();
        Ok(())
    }

    /// Runs `op` under a read lease on the current session.
    ///
    /// A transport error raised by `op` is recorded as a connection problem
    /// before the lease is released, then returned to the caller unchanged.
    pub async fn with_session<R, Op, Fut>(
        &self,
        op: Op,
    ) -> Result<R>
    where
        Op: FnOnce(Arc<F::Session>) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        self.ensure_open()?;

        let guard = self.state.session.read().await;
        let session = guard.as_ref().cloned().ok_or_else(|| {
            Error::from(ConnectionError::NotInitialized("session was never established".into()))
        })?;

        let result = op(session).await;
        if let Err(e) = &result {
            if e.is_transport() && self.state.problem.report(e.to_string()) {
                warn!("Connection problem recorded: {}", e);
            }
        }
        drop(guard);
        result
    }

    /// Records a failure detected outside a lease, e.g. by a protocol callback.
    ///
    /// Returns `false` if an earlier problem is still pending.
    pub fn report_problem(
        &self,
        reason: impl Into<String>,
    ) -> bool {
        let recorded = self.state.problem.report(reason);
        if recorded {
            debug!("Connection problem reported by callback");
        }
        recorded
    }

    pub fn problem(&self) -> Option<ProblemRecord> {
        self.state.problem.get()
    }

    pub fn has_problem(&self) -> bool {
        self.state.problem.is_set()
    }

    pub async fn is_connected(&self) -> bool {
        !self.is_closed() && !self.has_problem() && self.state.session.read().await.is_some()
    }

    pub fn register_reconnect_handler(
        &self,
        handler: Arc<dyn ReconnectHandler<F::Session>>,
    ) {
        self.state.handlers.rcu(|current| {
            let mut handlers = HandlerList::clone(current);
            handlers.push(handler.clone());
            handlers
        });
    }

    /// Returns `false` if the handler was not registered
    pub fn unregister_reconnect_handler(
        &self,
        handler: &Arc<dyn ReconnectHandler<F::Session>>,
    ) -> bool {
        let mut removed = false;
        self.state.handlers.rcu(|current| {
            let before = current.len();
            let handlers: HandlerList<F::Session> =
                current.iter().filter(|h| !same_handler(h, handler)).cloned().collect();
            removed = handlers.len() != before;
            handlers
        });
        removed
    }

    /// Force-closes the session and waits until the watchdog has observed the
    /// resulting problem. Intended for failure-injection tests.
    pub async fn simulate_failure(&self) -> Result<()> {
        self.ensure_open()?;
        let mut observed = self.state.observed.subscribe();
        let baseline = *observed.borrow_and_update();

        {
            let guard = self.state.session.write().await;
            let session = guard.as_ref().ok_or_else(|| {
                Error::from(ConnectionError::NotInitialized("session was never established".into()))
            })?;
            self.state.factory.close(session).await;
            self.state.problem.report("simulated failure");
        }

        let wait = async {
            while *observed.borrow_and_update() <= baseline {
                if observed.changed().await.is_err() {
                    break;
                }
            }
        };
        let limit = self.config.failure_observe_timeout();
        tokio::time::timeout(limit, wait)
            .await
            .map_err(|_| Error::timeout("simulate_failure", limit))
    }

    /// Stops the watchdog and releases the session. Later calls fail with
    /// `NotInitialized`.
    pub async fn close(&self) {
        if self.state.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(());

        let handle = self.watchdog.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("watchdog task failed: {:?}", e);
            }
        }

        let session = self.state.session.write().await.take();
        if let Some(session) = session {
            self.state.factory.close(&session).await;
        }
        self.state.problem.clear();
        info!("Connection manager closed");
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(ConnectionError::NotInitialized("connection manager is closed".into()).into());
        }
        Ok(())
    }

    fn start_watchdog(&self) {
        let mut slot = self.watchdog.lock();
        if slot.is_some() {
            return;
        }
        *slot = Some(watchdog::spawn(
            self.state.clone(),
            self.config.watchdog_period(),
            self.shutdown_tx.subscribe(),
        ));
    }
}

impl<F: SessionFactory> SessionState<F> {
    pub(super) async fn create_session(&self) -> Result<F::Session> {
        tokio::time::timeout(self.connect_timeout, self.factory.create())
            .await
            .map_err(|_| Error::timeout("connect", self.connect_timeout))?
    }

    /// Runs every handler in registration order. Failures are isolated.
    pub(super) async fn run_handlers(
        &self,
        session: &Arc<F::Session>,
    ) {
        let handlers = self.handlers.load_full();
        for (index, handler) in handlers.iter().enumerate() {
            if let Err(e) = handler.on_reconnect(session).await {
                RECONNECT_HANDLER_FAILURES.inc();
                error!(handler = index, "reconnect handler failed: {}", e);
            }
        }
    }
}

impl<F: SessionFactory> Drop for ConnectionManager<F> {
    fn drop(&mut self) {
        if let Some(handle) = self.watchdog.get_mut().take() {
            handle.abort();
        }
    }
}

fn same_handler<S>(
    a: &Arc<dyn ReconnectHandler<S>>,
    b: &Arc<dyn ReconnectHandler<S>>,
) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
