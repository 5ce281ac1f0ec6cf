//! Connector Error Hierarchy
//!
//! Defines the error types surfaced by the connector core, categorized by the
//! subsystem that raised them. Adapters branch on [`Error::kind`] instead of
//! matching nested enums.

use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed configuration. Fatal at construction, never retried.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Session establishment and transport failures
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Failures local to a single feature
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// Deadline exceeded while waiting for a remote endpoint
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// Notification subscription management failures
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Unrecoverable failures
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Coarse classification used by adapters to translate errors into their own
/// protocol representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Transport,
    NotFound,
    Timeout,
    Feature,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Session was never established or the manager has been closed
    #[error("Connection is not initialized: {0}")]
    NotInitialized(String),

    /// I/O failure after the session was established
    #[error("Transport failure: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    /// Discovery found nothing for the requested name
    #[error("Feature '{name}' not found")]
    NotFound { name: String },

    /// Value could not be converted to or from the feature's native type
    #[error("Cannot convert '{value}' to {expected}")]
    Conversion { value: String, expected: String },

    /// Write attempted on a read-only attribute
    #[error("Attribute '{name}' is read-only")]
    ReadOnly { name: String },

    /// Another notification feature already owns the category
    #[error("Category '{category}' is already enabled by '{owner}'")]
    CategoryInUse { category: String, owner: String },

    /// Remote name pattern does not compile
    #[error("Invalid name pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// No connector hosts the requested resource
    #[error("Resource '{0}' is not hosted")]
    UnknownResource(String),

    /// Operation was invoked with the wrong arguments
    #[error("Invalid arguments for '{name}': {reason}")]
    InvalidArguments { name: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
#[error("{operation} timed out after {duration:?}")]
pub struct TimeoutError {
    pub operation: String,
    pub duration: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Unsubscribe was requested for a listener with no subscriptions
    #[error("Listener has no subscriptions")]
    ListenerNotFound,

    /// Unknown subscription identifier
    #[error("Subscription {0} not found")]
    SubscriptionNotFound(u64),

    /// A listener failed while handling a notification
    #[error("Listener failed: {0}")]
    Listener(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Configuration,
            Error::Connection(_) => ErrorKind::Transport,
            Error::Feature(FeatureError::NotFound { .. }) | Error::Feature(FeatureError::UnknownResource(_)) => {
                ErrorKind::NotFound
            }
            Error::Feature(_) => ErrorKind::Feature,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Dispatch(DispatchError::ListenerNotFound) | Error::Dispatch(DispatchError::SubscriptionNotFound(_)) => {
                ErrorKind::NotFound
            }
            Error::Dispatch(_) | Error::Fatal(_) => ErrorKind::Internal,
        }
    }

    /// Only transport failures are recorded as connection problems. A session
    /// that was never initialized is not something the watchdog can repair.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Connection(ConnectionError::Transport { .. }))
    }

    pub fn transport(message: impl Into<String>) -> Self {
        ConnectionError::Transport {
            message: message.into(),
            source: None,
        }
        .into()
    }

    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectionError::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
        .into()
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        FeatureError::NotFound { name: name.into() }.into()
    }

    pub fn timeout(
        operation: impl Into<String>,
        duration: Duration,
    ) -> Self {
        TimeoutError {
            operation: operation.into(),
            duration,
        }
        .into()
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::transport_with_source("I/O failure", e)
    }
}
