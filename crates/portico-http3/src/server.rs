//! The HTTP/3 server loop.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use h3::error::ErrorLevel;
use h3::server::RequestStream;
use http::StatusCode;
use portico_core::{Core, CtxPool};
use portico_network::{raw_connection_as, ConnHandler, StreamConn};
use tracing::{debug, trace};

use crate::adaptor;
use crate::error::Http3Error;

/// Default upper bound on a request body, in bytes.
pub const DEFAULT_MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

type H3Stream = RequestStream<h3_quinn::BidiStream<Bytes>, Bytes>;

#[derive(Debug, Clone, Copy)]
pub struct Http3Options {
    /// Requests with a larger body are answered with `413` and never reach
    /// the core.
    pub max_body_size: usize,
}

impl Default for Http3Options {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// Serves HTTP/3 over QUIC connections into a [`Core`].
pub struct Http3Server<C> {
    core: Arc<C>,
    pool: Arc<CtxPool>,
    options: Http3Options,
}

impl<C: Core> Http3Server<C> {
    pub fn new(core: Arc<C>) -> Self {
        Self::with_options(core, Http3Options::default())
    }

    pub fn with_options(core: Arc<C>, options: Http3Options) -> Self {
        let pool = core.ctx_pool();
        Self {
            core,
            pool,
            options,
        }
    }

    pub fn options(&self) -> Http3Options {
        self.options
    }

    /// Serve HTTP/3 on a connection accepted by the QUIC transport.
    ///
    /// Fails with [`Http3Error::UnsupportedConnection`] if `conn` is not
    /// backed by a quinn connection.
    pub async fn serve(&self, conn: &dyn StreamConn) -> Result<(), Http3Error> {
        let quic = raw_connection_as::<quinn::Connection>(conn)
            .ok_or(Http3Error::UnsupportedConnection)?
            .clone();
        self.serve_quic_conn(quic).await
    }

    /// Run the `h3` server on `conn` until the connection ends.
    pub async fn serve_quic_conn(&self, conn: quinn::Connection) -> Result<(), Http3Error> {
        let remote = conn.remote_address();
        let mut h3_conn: h3::server::Connection<h3_quinn::Connection, Bytes> =
            h3::server::Connection::new(h3_quinn::Connection::new(conn)).await?;
        debug!(%remote, "HTTP/3 connection established");

        loop {
            match h3_conn.accept().await {
                Ok(Some((request, stream))) => {
                    let dispatch = Dispatch {
                        core: Arc::clone(&self.core),
                        pool: Arc::clone(&self.pool),
                        max_body_size: self.options.max_body_size,
                    };
                    tokio::spawn(async move {
                        if let Err(e) = dispatch.serve_request(request, stream, remote).await {
                            debug!(%remote, error = %e, "HTTP/3 request failed");
                        }
                    });
                }
                Ok(None) => {
                    debug!(%remote, "HTTP/3 connection finished");
                    return Ok(());
                }
                Err(e) => match e.get_error_level() {
                    ErrorLevel::StreamError => {
                        debug!(%remote, error = %e, "HTTP/3 stream error");
                    }
                    ErrorLevel::ConnectionError => return Err(e.into()),
                },
            }
        }
    }
}

#[async_trait]
impl<C: Core> ConnHandler for Http3Server<C> {
    async fn on_conn(&self, conn: Box<dyn StreamConn>) -> anyhow::Result<()> {
        self.serve(conn.as_ref()).await?;
        Ok(())
    }
}

/// Everything a request task needs, detached from the server.
struct Dispatch<C> {
    core: Arc<C>,
    pool: Arc<CtxPool>,
    max_body_size: usize,
}

impl<C: Core> Dispatch<C> {
    async fn serve_request(
        &self,
        request: http::Request<()>,
        mut stream: H3Stream,
        remote: SocketAddr,
    ) -> Result<(), Http3Error> {
        trace!(%remote, method = %request.method(), uri = %request.uri(), "HTTP/3 request");

        // Returned to the pool when dropped, whichever way this function exits.
        let mut ctx = self.pool.get();
        adaptor::copy_request_head(&request, &mut ctx.request);

        if !read_body(&mut stream, &mut ctx.request.body, self.max_body_size).await? {
            debug!(%remote, limit = self.max_body_size, "request body too large");
            let mut head = http::Response::new(());
            *head.status_mut() = StatusCode::PAYLOAD_TOO_LARGE;
            stream.send_response(head).await?;
            stream.finish().await?;
            return Ok(());
        }

        self.core.serve_http(&mut ctx).await;

        stream
            .send_response(adaptor::response_head(&ctx.response))
            .await?;
        if !ctx.response.body().is_empty() {
            stream
                .send_data(Bytes::copy_from_slice(ctx.response.body()))
                .await?;
        }
        stream.finish().await?;
        Ok(())
    }
}

/// Read the request body into `dst`. Returns `false` once it grows past
/// `limit`.
async fn read_body(
    stream: &mut H3Stream,
    dst: &mut BytesMut,
    limit: usize,
) -> Result<bool, Http3Error> {
    while let Some(chunk) = stream.recv_data().await? {
        if dst.len() + chunk.remaining() > limit {
            return Ok(false);
        }
        dst.put(chunk);
    }
    Ok(true)
}
