//! QUIC transport: bind, accept, and dispatch.

use std::net::{SocketAddr, UdpSocket};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use async_trait::async_trait;
use portico_network::{ConnHandler, Transporter};
use quinn::{Endpoint, EndpointConfig, VarInt};
use tracing::{debug, info, warn};

use crate::config::{resolve_bind_addr, TransportOptions};
use crate::connection::{QuicConn, QUIC_VERSION_1};
use crate::error::TransportError;
use crate::tls;

/// Lifecycle of a [`QuicTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Unbound,
    Listening,
    Closed,
}

/// Where the endpoint's socket comes from.
enum BindTarget {
    Socket(UdpSocket),
    Addr(SocketAddr),
}

fn same_handler(a: &Arc<dyn ConnHandler>, b: &Arc<dyn ConnHandler>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

#[derive(Default)]
enum Slot {
    #[default]
    Unbound,
    Listening(Endpoint),
    Closed,
}

/// Counters kept at the dispatch site.
#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicU64,
    handshake_failures: AtomicU64,
    handler_failures: AtomicU64,
}

/// A snapshot of a transport's connection counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Connections taken off the endpoint and handed to a task.
    pub accepted: u64,
    /// Connections refused or whose handshake failed.
    pub handshake_failures: u64,
    /// Handler invocations that returned an error.
    pub handler_failures: u64,
}

/// QUIC transport for portico.
///
/// Binds a quinn endpoint and hands every accepted connection to the
/// registered [`ConnHandler`] on its own task. Connections are dispatched as
/// soon as quinn accepts them, in their 0.5-RTT phase, without waiting for
/// the handshake to be confirmed.
///
/// Serving borrows the transport, so share it through an `Arc` to close it
/// from another task.
pub struct QuicTransport {
    options: TransportOptions,
    slot: Mutex<Slot>,
    handler: OnceLock<Arc<dyn ConnHandler>>,
    counters: Arc<Counters>,
}

impl QuicTransport {
    /// A transport bound to `addr` with the given TLS configuration.
    pub fn new(addr: impl Into<String>, tls: Option<Arc<rustls::ServerConfig>>) -> Self {
        let mut options = TransportOptions::new(addr);
        options.tls = tls;
        Self::with_options(options)
    }

    pub fn with_options(options: TransportOptions) -> Self {
        Self {
            options,
            slot: Mutex::new(Slot::Unbound),
            handler: OnceLock::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    /// Register the connection handler. It can be set only once.
    pub fn set_handler(&self, handler: Arc<dyn ConnHandler>) -> Result<(), TransportError> {
        self.handler
            .set(handler)
            .map_err(|_| TransportError::AlreadyServing)
    }

    /// Serve with the certificate pair in `cert_file` and `key_file`.
    ///
    /// Only the certificate is taken into the TLS configuration; any TLS
    /// configuration in the options is ignored. A handler must have been
    /// registered with [`QuicTransport::set_handler`].
    pub async fn listen_and_serve_tls(
        &self,
        cert_file: &Path,
        key_file: &Path,
    ) -> Result<(), TransportError> {
        let tls = tls::load_server_config(cert_file, key_file)?;
        self.serve_conn(Some(tls), None).await
    }

    /// Bind and run the accept loop.
    ///
    /// Binds the configured address unless a pre-bound `socket` is given.
    /// Returns only on failure: a missing TLS configuration or handler, a
    /// bind error, or the endpoint being closed.
    pub async fn serve_conn(
        &self,
        tls: Option<Arc<rustls::ServerConfig>>,
        socket: Option<UdpSocket>,
    ) -> Result<(), TransportError> {
        let tls = tls.ok_or(TransportError::TlsRequired)?;
        let handler = self
            .handler
            .get()
            .cloned()
            .ok_or(TransportError::NoHandler)?;

        let endpoint = self.bind(&tls, self.bind_target(socket).await?)?;
        self.run(&endpoint, &handler).await
    }

    /// The address the endpoint is bound to, once listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.lock_slot() {
            Slot::Listening(endpoint) => endpoint.local_addr().ok(),
            Slot::Unbound | Slot::Closed => None,
        }
    }

    pub fn state(&self) -> TransportState {
        match &*self.lock_slot() {
            Slot::Unbound => TransportState::Unbound,
            Slot::Listening(_) => TransportState::Listening,
            Slot::Closed => TransportState::Closed,
        }
    }

    pub fn stats(&self) -> TransportStats {
        TransportStats {
            accepted: self.counters.accepted.load(Ordering::Relaxed),
            handshake_failures: self.counters.handshake_failures.load(Ordering::Relaxed),
            handler_failures: self.counters.handler_failures.load(Ordering::Relaxed),
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// TLS material for [`Transporter::listen_and_serve`]: the configured
    /// TLS configuration, else the configured file pair, else a generated
    /// self-signed certificate.
    fn default_tls(&self) -> Result<Arc<rustls::ServerConfig>, TransportError> {
        if let Some(tls) = &self.options.tls {
            return Ok(Arc::clone(tls));
        }
        match (&self.options.cert_file, &self.options.key_file) {
            (Some(cert), Some(key)) => tls::load_server_config(cert, key),
            (None, None) => {
                warn!("no TLS material configured, using a generated self-signed certificate");
                tls::self_signed_server_config()
            }
            _ => Err(TransportError::Config(
                "cert_file and key_file must be set together".to_string(),
            )),
        }
    }

    async fn bind_target(&self, socket: Option<UdpSocket>) -> Result<BindTarget, TransportError> {
        match socket {
            Some(socket) => Ok(BindTarget::Socket(socket)),
            None => Ok(BindTarget::Addr(resolve_bind_addr(&self.options.addr).await?)),
        }
    }

    fn bind(
        &self,
        tls: &rustls::ServerConfig,
        target: BindTarget,
    ) -> Result<Endpoint, TransportError> {
        let crypto = tls::quic_server_crypto(tls)?;
        let transport = self.options.effective_quic().to_transport_config()?;
        let mut server_config = quinn::ServerConfig::with_crypto(Arc::new(crypto));
        server_config.transport_config(Arc::new(transport));

        let mut slot = self.lock_slot();
        match *slot {
            Slot::Unbound => {}
            Slot::Listening(_) => return Err(TransportError::AlreadyServing),
            Slot::Closed => return Err(TransportError::EndpointClosed),
        }

        let socket = match target {
            BindTarget::Socket(socket) => socket,
            BindTarget::Addr(addr) => UdpSocket::bind(addr).map_err(TransportError::Bind)?,
        };
        socket.set_nonblocking(true).map_err(TransportError::Bind)?;

        let mut endpoint_config = EndpointConfig::default();
        endpoint_config.supported_versions(vec![QUIC_VERSION_1]);
        let endpoint = Endpoint::new(
            endpoint_config,
            Some(server_config),
            socket,
            Arc::new(quinn::TokioRuntime),
        )
        .map_err(TransportError::Bind)?;

        *slot = Slot::Listening(endpoint.clone());
        Ok(endpoint)
    }

    async fn run(
        &self,
        endpoint: &Endpoint,
        handler: &Arc<dyn ConnHandler>,
    ) -> Result<(), TransportError> {
        match endpoint.local_addr() {
            Ok(addr) => info!(addr = %addr, "QUIC transport listening"),
            Err(e) => warn!(error = %e, "QUIC transport listening on unknown address"),
        }
        self.accept_loop(endpoint, handler).await
    }

    async fn accept_loop(
        &self,
        endpoint: &Endpoint,
        handler: &Arc<dyn ConnHandler>,
    ) -> Result<(), TransportError> {
        loop {
            let Some(incoming) = endpoint.accept().await else {
                info!("QUIC transport stopped accepting");
                return Err(TransportError::EndpointClosed);
            };

            let remote = incoming.remote_address();
            let connecting = match incoming.accept() {
                Ok(connecting) => connecting,
                Err(e) => {
                    self.counters
                        .handshake_failures
                        .fetch_add(1, Ordering::Relaxed);
                    debug!(remote = %remote, error = %e, "failed to accept connection");
                    continue;
                }
            };

            self.counters.accepted.fetch_add(1, Ordering::Relaxed);
            tokio::spawn(dispatch(
                connecting,
                Arc::clone(handler),
                Arc::clone(&self.counters),
            ));
        }
    }
}

/// Finish accepting one connection and run the handler on it.
async fn dispatch(
    connecting: quinn::Connecting,
    handler: Arc<dyn ConnHandler>,
    counters: Arc<Counters>,
) {
    let remote = connecting.remote_address();
    let connection = match connecting.into_0rtt() {
        Ok((connection, _accepted)) => connection,
        Err(connecting) => match connecting.await {
            Ok(connection) => connection,
            Err(e) => {
                counters.handshake_failures.fetch_add(1, Ordering::Relaxed);
                debug!(remote = %remote, error = %e, "handshake failed");
                return;
            }
        },
    };

    debug!(remote = %remote, "accepted connection");
    let conn = QuicConn::with_version(connection, QUIC_VERSION_1);
    if let Err(e) = handler.on_conn(Box::new(conn)).await {
        counters.handler_failures.fetch_add(1, Ordering::Relaxed);
        debug!(remote = %remote, error = %e, "connection handler failed");
    }
}

#[async_trait]
impl Transporter for QuicTransport {
    type Error = TransportError;

    /// The handler is stored only once the endpoint is bound, so a failed
    /// attempt can be retried.
    async fn listen_and_serve(&self, handler: Arc<dyn ConnHandler>) -> Result<(), TransportError> {
        if let Some(registered) = self.handler.get() {
            if !same_handler(registered, &handler) {
                return Err(TransportError::AlreadyServing);
            }
        }
        let tls = self.default_tls()?;

        let endpoint = self.bind(&tls, self.bind_target(None).await?)?;
        let handler = Arc::clone(self.handler.get_or_init(|| handler));
        self.run(&endpoint, &handler).await
    }

    /// Close the endpoint. Closing a transport that never bound only marks
    /// it closed.
    fn close(&self) -> Result<(), TransportError> {
        let mut slot = self.lock_slot();
        if let Slot::Listening(endpoint) = std::mem::replace(&mut *slot, Slot::Closed) {
            endpoint.close(VarInt::from_u32(0), b"shutdown");
            info!("QUIC transport closed");
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        self.close()
    }
}
