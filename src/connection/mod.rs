//! Resilient session management.
//!
//! - [`ConnectionManager`] - owns the session and hands out scoped leases
//! - [`ConnectionProblem`] - single-slot failure record shared with the watchdog
//! - [`SessionFactory`] / [`ReconnectHandler`] - protocol-side seams

mod manager;
mod problem;
mod session;
mod watchdog;

pub use manager::*;
pub use problem::*;
pub use session::*;

#[cfg(test)]
mod manager_test;
