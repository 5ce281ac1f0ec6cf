//! Resilient connector core for remote manageable endpoints.
//!
//! Remote attributes, operations and notifications, reached over whatever
//! protocol a [`Protocol`] implementation speaks, are exposed through one
//! uniform feature model and one adapter-facing interface
//! ([`ResourceConnector`] / [`ResourceHub`]).
//!
//! Building blocks, leaves first:
//! - [`RequestCorrelator`] / [`CorrelatedClient`] - send-with-callback to awaitable calls
//! - [`ConnectionManager`] - session leases, watchdog and reconnect handlers
//! - [`FeatureRepository`] - identity-keyed feature catalog per kind
//! - [`NotificationDispatcher`] - sequenced fan-out to subscribed listeners
//! - [`Connector`] - composes the above for one resource

mod config;
mod connection;
mod connector;
mod correlation;
mod errors;
mod feature;
mod metrics;
mod notification;

pub use config::*;
pub use connection::*;
pub use connector::*;
pub use correlation::*;
pub use errors::*;
pub use feature::*;
pub use metrics::*;
pub use notification::*;


//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
