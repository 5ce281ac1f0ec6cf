//! Periodic repair of broken sessions.
//!
//! One tick per period. A tick with an empty problem slot does nothing. A tick
//! that finds a problem takes the write lease, builds a brand-new session,
//! re-runs every reconnect handler and only then clears the slot. A failed
//! attempt leaves the problem in place for the next tick.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::manager::SessionState;
use super::SessionFactory;
use crate::metrics::RECONNECT_ATTEMPTS;
use crate::metrics::RECONNECT_SUCCESSES;

pub(super) fn spawn<F: SessionFactory>(
    state: Arc<SessionState<F>>,
    period: Duration,
    mut shutdown_signal: watch::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        interval.tick().await;
        debug!(?period, "Watchdog started");

        loop {
            tokio::select! {
                _ = shutdown_signal.changed() => {
                    debug!("Watchdog received shutdown signal");
                    break;
                }
                _ = interval.tick() => {
                    if state.closed.load(Ordering::SeqCst) {
                        break;
                    }
                    tick(&state).await;
                }
            }
        }

        debug!("Watchdog stopped");
    })
}

/// Returns `true` if this tick replaced the session
pub(super) async fn tick<F: SessionFactory>(state: &SessionState<F>) -> bool {
    if !state.problem.is_set() {
        trace!("Watchdog tick: session healthy");
        return false;
    }

    let mut guard = state.session.write().await;
    let problem = match state.problem.get() {
        Some(problem) => problem,
        None => return false,
    };
    state.observed.send_modify(|count| *count += 1);
    RECONNECT_ATTEMPTS.inc();
    warn!(reason = %problem, "Connection problem detected, reconnecting");

    match state.create_session().await {
        Ok(session) => {
            let session = Arc::new(session);
            if let Some(old) = guard.replace(session.clone()) {
                state.factory.close(&old).await;
            }
            state.run_handlers(&session).await;
            state.problem.clear();
            RECONNECT_SUCCESSES.inc();
            info!(
                outage_ms = problem.reported_at.elapsed().as_millis() as u64,
                "Session re-established"
            );
            true
        }
        Err(e) => {
            warn!("Reconnection attempt failed, retrying on next tick: {}", e);
            false
        }
    }
}
