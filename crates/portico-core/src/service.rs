//! The request-serving entry point.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::pool::CtxPool;

/// Serves requests delivered by a protocol server.
///
/// Protocol servers acquire a context from [`Core::ctx_pool`], fill in the
/// request, call [`Core::serve_http`] and write out whatever the core left
/// in the response.
#[async_trait]
pub trait Core: Send + Sync + 'static {
    /// The pool request contexts are taken from and returned to.
    fn ctx_pool(&self) -> Arc<CtxPool>;

    async fn serve_http(&self, ctx: &mut RequestContext);
}
