//! Notification fan-out.
//!
//! Protocol callbacks feed raw notifications into a [`NotificationCollector`],
//! which turns them into [`NotificationEnvelope`]s and hands them to the
//! [`NotificationDispatcher`].

mod collector;
mod dispatcher;
mod envelope;
mod filter;
mod subscription;

pub use collector::*;
pub use dispatcher::*;
pub use envelope::*;
pub use filter::*;
pub use subscription::*;
