use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing_test::traced_test;

use super::*;
use crate::test_utils::enable_logger;
use crate::test_utils::MemoryEndpoint;
use crate::test_utils::MemoryFactory;
use crate::test_utils::MemorySession;
use crate::test_utils::RecordingHandler;
use crate::ConnectionConfig;
use crate::ConnectionError;
use crate::Error;
use crate::ErrorKind;

fn test_config() -> ConnectionConfig {
    ConnectionConfig {
        endpoint: "mem://device:1".to_string(),
        watchdog_period_in_ms: 100,
        connect_timeout_in_ms: 50,
        failure_observe_timeout_in_ms: 1_000,
    }
}

fn manager(endpoint: &Arc<MemoryEndpoint>) -> ConnectionManager<MemoryFactory> {
    ConnectionManager::new(MemoryFactory::new(endpoint.clone()), test_config())
}

fn as_handler(handler: &Arc<RecordingHandler>) -> Arc<dyn ReconnectHandler<MemorySession>> {
    handler.clone()
}

#[tokio::test]
async fn test_with_session_before_connect_is_not_initialized() {
    let endpoint = MemoryEndpoint::new();
    let manager = manager(&endpoint);

    let result = manager.with_session(|_| async { Ok(()) }).await;

    assert!(matches!(
        result,
        Err(Error::Connection(ConnectionError::NotInitialized(_)))
    ));
    assert!(!manager.has_problem());
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let endpoint = MemoryEndpoint::new();
    let manager = manager(&endpoint);
    let handler = RecordingHandler::new();
    manager.register_reconnect_handler(as_handler(&handler));

    manager.connect().await.unwrap();
    manager.connect().await.unwrap();

    assert_eq!(endpoint.sessions_created(), 1);
    assert_eq!(handler.seen(), vec![1]);
    assert!(manager.is_connected().await);
    manager.close().await;
}

#[tokio::test]
async fn test_connect_fails_when_unreachable() {
    let endpoint = MemoryEndpoint::new();
    endpoint.set_reachable(false);
    let manager = manager(&endpoint);

    let err = manager.connect().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(!manager.is_connected().await);
}

#[tokio::test(start_paused = true)]
async fn test_connect_honours_deadline() {
    let endpoint = MemoryEndpoint::new();
    endpoint.set_connect_delay(Duration::from_secs(5));
    let manager = manager(&endpoint);

    let err = manager.connect().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[tokio::test]
#[traced_test]
async fn test_transport_error_is_recorded_and_returned() {
    let endpoint = MemoryEndpoint::new();
    let manager = manager(&endpoint);
    manager.connect().await.unwrap();

    let result: crate::Result<()> = manager
        .with_session(|_| async { Err(Error::transport("connection reset")) })
        .await;

    assert!(result.unwrap_err().is_transport());
    let problem = manager.problem().unwrap();
    assert!(problem.reason.contains("connection reset"));
    assert!(logs_contain("Connection problem recorded"));
    manager.close().await;
}

#[tokio::test]
async fn test_non_transport_error_is_not_recorded() {
    let endpoint = MemoryEndpoint::new();
    let manager = manager(&endpoint);
    manager.connect().await.unwrap();

    let result: crate::Result<()> = manager.with_session(|_| async { Err(Error::not_found("ifSpeed.9")) }).await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
    assert!(!manager.has_problem());
    manager.close().await;
}

#[tokio::test]
async fn test_report_problem_keeps_first_reason() {
    let endpoint = MemoryEndpoint::new();
    let manager = manager(&endpoint);

    assert!(manager.report_problem("trap socket closed"));
    assert!(!manager.report_problem("second"));
    assert_eq!(manager.problem().unwrap().reason, "trap socket closed");
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_replaces_session_and_reruns_handlers_in_order() {
    enable_logger();
    let endpoint = MemoryEndpoint::new();
    let manager = manager(&endpoint);

    let order = Arc::new(Mutex::new(Vec::new()));
    let first = RecordingHandler::labelled("first", order.clone());
    let second = RecordingHandler::labelled("second", order.clone());
    manager.register_reconnect_handler(as_handler(&first));
    manager.register_reconnect_handler(as_handler(&second));

    manager.connect().await.unwrap();
    manager.report_problem("link lost");

    tokio::time::sleep(Duration::from_millis(250)).await;

    assert!(!manager.has_problem());
    assert_eq!(endpoint.sessions_created(), 2);
    assert_eq!(first.seen(), vec![1, 2]);
    assert_eq!(second.seen(), vec![1, 2]);
    assert_eq!(*order.lock(), vec!["first", "second", "first", "second"]);
    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_failing_handler_does_not_block_others() {
    let endpoint = MemoryEndpoint::new();
    let manager = manager(&endpoint);
    let failing = RecordingHandler::failing();
    let healthy = RecordingHandler::new();
    manager.register_reconnect_handler(as_handler(&failing));
    manager.register_reconnect_handler(as_handler(&healthy));

    manager.connect().await.unwrap();
    manager.report_problem("link lost");
    tokio::time::sleep(Duration::from_millis(250)).await;

    assert_eq!(failing.seen(), vec![1, 2]);
    assert_eq!(healthy.seen(), vec![1, 2]);
    assert!(!manager.has_problem());
    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_keeps_problem_until_endpoint_returns() {
    let endpoint = MemoryEndpoint::new();
    let manager = manager(&endpoint);
    manager.connect().await.unwrap();

    endpoint.set_reachable(false);
    manager.report_problem("link lost");
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(manager.has_problem());
    assert_eq!(endpoint.sessions_created(), 1);

    endpoint.set_reachable(true);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!manager.has_problem());
    assert_eq!(endpoint.sessions_created(), 2);
    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_simulate_failure_waits_for_watchdog() {
    let endpoint = MemoryEndpoint::new();
    let manager = manager(&endpoint);
    manager.connect().await.unwrap();

    let old = manager.with_session(|s| async move { Ok(s) }).await.unwrap();
    manager.simulate_failure().await.unwrap();

    assert!(!old.is_open());
    // the watchdog has observed the problem; give it time to finish the swap
    tokio::time::sleep(Duration::from_millis(10)).await;
    let current = manager.with_session(|s| async move { Ok(s.id()) }).await.unwrap();
    assert_eq!(current, 2);
    manager.close().await;
}

#[tokio::test]
async fn test_unregister_reconnect_handler() {
    let endpoint = MemoryEndpoint::new();
    let manager = manager(&endpoint);
    let handler = as_handler(&RecordingHandler::new());
    let stranger = as_handler(&RecordingHandler::new());

    manager.register_reconnect_handler(handler.clone());

    assert!(!manager.unregister_reconnect_handler(&stranger));
    assert!(manager.unregister_reconnect_handler(&handler));
    assert!(!manager.unregister_reconnect_handler(&handler));
}

#[tokio::test]
async fn test_close_releases_session_and_rejects_calls() {
    let endpoint = MemoryEndpoint::new();
    let manager = manager(&endpoint);
    manager.connect().await.unwrap();
    let session = manager.with_session(|s| async move { Ok(s) }).await.unwrap();

    manager.close().await;
    manager.close().await;

    assert!(!session.is_open());
    assert!(manager.is_closed());
    assert!(!manager.is_connected().await);
    let err = manager.with_session(|_| async { Ok(()) }).await.unwrap_err();
    assert!(matches!(err, Error::Connection(ConnectionError::NotInitialized(_))));
    assert!(manager.connect().await.is_err());
}
