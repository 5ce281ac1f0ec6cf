//! Shared fixtures for unit tests: an in-memory management endpoint, a
//! loopback agent for correlated requests and logger setup.
mod loopback;
mod memory;

pub use loopback::*;
pub use memory::*;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}
