//! Connector façade and resource hosting.
//!
//! - [`Connector`] - one resource, generic over its [`Protocol`]
//! - [`ResourceConnector`] - object-safe view used by adapters
//! - [`ResourceHub`] - many connectors keyed by resource name

mod builder;
#[allow(clippy::module_inception)]
mod connector;
mod hub;
mod protocol;
mod resource;

pub use builder::*;
pub use connector::*;
pub use hub::*;
pub use protocol::*;
pub use resource::*;
