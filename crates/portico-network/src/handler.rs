//! Connection handlers and the transport contract.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::conn::StreamConn;

/// Handles one accepted connection for its whole lifetime.
///
/// A transport invokes the handler once per connection, each on its own
/// task. Returned errors are logged by the transport and go no further.
#[async_trait]
pub trait ConnHandler: Send + Sync + 'static {
    async fn on_conn(&self, conn: Box<dyn StreamConn>) -> anyhow::Result<()>;
}

/// A [`ConnHandler`] backed by an async closure. See [`handler_fn`].
pub struct FnHandler<F> {
    f: F,
}

/// Build a [`ConnHandler`] from an async closure.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Box<dyn StreamConn>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> ConnHandler for FnHandler<F>
where
    F: Fn(Box<dyn StreamConn>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn on_conn(&self, conn: Box<dyn StreamConn>) -> anyhow::Result<()> {
        (self.f)(conn).await
    }
}

/// A listening transport that dispatches accepted connections to a handler.
#[async_trait]
pub trait Transporter: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Bind and serve until the transport is closed or accepting fails.
    async fn listen_and_serve(&self, handler: Arc<dyn ConnHandler>) -> Result<(), Self::Error>;

    /// Stop accepting. In-flight handlers keep running.
    fn close(&self) -> Result<(), Self::Error>;

    async fn shutdown(&self) -> Result<(), Self::Error>;
}
