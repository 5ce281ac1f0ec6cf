use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use tracing::error;

#[cfg(test)]
mod metrics_test;

/// Dispatcher was suspended
pub const DROP_SUSPENDED: &str = "suspended";
/// A channel subscription's buffer was full
pub const DROP_BUFFER_FULL: &str = "buffer_full";

lazy_static! {
    pub static ref RECONNECT_ATTEMPTS: IntCounter =
        IntCounter::new("reconnect_attempts", "Watchdog reconnection attempts")
            .expect("metric can not be created");

    pub static ref RECONNECT_SUCCESSES: IntCounter =
        IntCounter::new("reconnect_successes", "Sessions re-established by the watchdog")
            .expect("metric can not be created");

    pub static ref RECONNECT_HANDLER_FAILURES: IntCounter =
        IntCounter::new("reconnect_handler_failures", "Reconnect handlers that returned an error")
            .expect("metric can not be created");

    pub static ref NOTIFICATIONS_DISPATCHED: IntCounter =
        IntCounter::new("notifications_dispatched", "Envelopes that reached the delivery loop")
            .expect("metric can not be created");

    /// `reason` is one of [`DROP_SUSPENDED`] or [`DROP_BUFFER_FULL`]
    pub static ref NOTIFICATIONS_DROPPED: IntCounterVec = IntCounterVec::new(
        Opts::new("notifications_dropped", "Envelopes never handed to a listener"),
        &["reason"]
    )
    .expect("metric can not be created");

    pub static ref LISTENER_FAILURES: IntCounter =
        IntCounter::new("listener_failures", "Listener invocations that failed")
            .expect("metric can not be created");

    pub static ref REQUEST_TIMEOUTS: IntCounterVec = IntCounterVec::new(
        Opts::new("request_timeouts", "Correlated requests that hit their deadline"),
        &["operation"]
    )
    .expect("metric can not be created");

    pub static ref FEATURE_REBUILDS: IntCounterVec = IntCounterVec::new(
        Opts::new("feature_rebuilds", "Features torn down and rebound because their identity changed"),
        &["kind"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = {
        let registry = Registry::new();
        register_custom_metrics(&registry);
        registry
    };
}

fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(RECONNECT_ATTEMPTS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(RECONNECT_SUCCESSES.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(RECONNECT_HANDLER_FAILURES.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(NOTIFICATIONS_DISPATCHED.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(NOTIFICATIONS_DROPPED.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(LISTENER_FAILURES.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(REQUEST_TIMEOUTS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(FEATURE_REBUILDS.clone()))
        .expect("collector can be registered");
}

/// Export metrics in the Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    }
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
