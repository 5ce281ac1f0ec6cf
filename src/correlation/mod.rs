//! Asynchronous request/response correlation.
//!
//! [`RequestCorrelator`] turns a send-with-callback primitive into an
//! awaitable call with a deadline. [`CorrelatedClient`] builds get, bulk and
//! walk requests on top of it for identifier-addressed protocols.

mod client;
mod correlator;
mod oid;
mod transport;

pub use client::*;
pub use correlator::*;
pub use oid::*;
pub use transport::*;
