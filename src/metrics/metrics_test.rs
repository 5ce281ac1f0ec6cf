use super::*;

#[test]
fn test_registry_exports_custom_metrics() {
    REQUEST_TIMEOUTS.with_label_values(&["walk"]).inc();

    let body = gather_metrics();
    assert!(body.contains("request_timeouts"), "Missing request_timeouts");
    assert!(body.contains("reconnect_attempts"), "Missing reconnect_attempts");
}

#[test]
fn test_counter_increment() {
    FEATURE_REBUILDS.with_label_values(&["metrics_test"]).inc();
    FEATURE_REBUILDS.with_label_values(&["metrics_test"]).inc();

    let value = FEATURE_REBUILDS.with_label_values(&["metrics_test"]).get();
    assert_eq!(value, 2, "Counter should increment correctly");
}
