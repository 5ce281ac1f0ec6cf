use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;

/// Creates and disposes sessions against one remote endpoint.
///
/// Implemented by each protocol on top of its client library. `create` may
/// block on the network; the manager bounds it with the connect deadline.
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    type Session: Send + Sync + 'static;

    async fn create(&self) -> Result<Self::Session>;

    /// Releases a session that is being replaced or shut down
    async fn close(
        &self,
        _session: &Self::Session,
    ) {
    }
}

/// Callback run every time a new session is established.
///
/// Runs while the manager holds its write lease, so it must use the session
/// it is given instead of calling back into `with_session`.
#[async_trait]
pub trait ReconnectHandler<S>: Send + Sync + 'static {
    async fn on_reconnect(
        &self,
        session: &Arc<S>,
    ) -> Result<()>;
}
