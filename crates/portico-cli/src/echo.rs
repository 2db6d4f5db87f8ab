//! A core that answers every request with what it received.

use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use portico_core::{Core, CtxPool, RequestContext};

/// Echoes the request body back, or a summary line for bodiless requests.
pub struct EchoCore {
    pool: Arc<CtxPool>,
}

impl EchoCore {
    pub fn new() -> Self {
        Self {
            pool: Arc::new(CtxPool::default()),
        }
    }
}

impl Default for EchoCore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Core for EchoCore {
    fn ctx_pool(&self) -> Arc<CtxPool> {
        Arc::clone(&self.pool)
    }

    async fn serve_http(&self, ctx: &mut RequestContext) {
        let req = &ctx.request;
        let body = if req.body().is_empty() {
            format!("{} {}\n", req.method, req.uri).into_bytes()
        } else {
            req.body().to_vec()
        };
        let content_type = req
            .header("content-type")
            .unwrap_or("text/plain; charset=utf-8")
            .to_owned();

        ctx.response.set_status(StatusCode::OK);
        ctx.response.add_header("content-type", &content_type);
        ctx.response.set_body(body);
    }
}
