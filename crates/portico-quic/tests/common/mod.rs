//! Loopback fixtures shared by the integration tests.

#![allow(dead_code)]

use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

use portico_certgen::GeneratedCert;
use portico_network::{handler_fn, ConnHandler, StreamConn};
use portico_quic::{tls, QuicTransport, TransportError};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A transport serving on an ephemeral loopback port.
pub struct TestServer {
    pub transport: Arc<QuicTransport>,
    pub addr: SocketAddr,
    pub cert: GeneratedCert,
    pub serving: JoinHandle<Result<(), TransportError>>,
}

/// Start a transport on `127.0.0.1:0` with a fresh self-signed certificate.
pub fn start_server(handler: Arc<dyn ConnHandler>) -> TestServer {
    init_tracing();
    let cert = portico_certgen::generate_certificate("localhost").unwrap();
    let tls_config = tls::server_config(&cert.cert_pem, &cert.key_pem).unwrap();

    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = socket.local_addr().unwrap();

    let transport = Arc::new(QuicTransport::new(addr.to_string(), None));
    transport.set_handler(handler).unwrap();

    let serving = tokio::spawn({
        let transport = Arc::clone(&transport);
        async move { transport.serve_conn(Some(tls_config), Some(socket)).await }
    });

    TestServer {
        transport,
        addr,
        cert,
        serving,
    }
}

/// A handler that forwards every connection to the returned receiver.
pub fn channel_handler() -> (Arc<dyn ConnHandler>, mpsc::Receiver<Box<dyn StreamConn>>) {
    let (tx, rx) = mpsc::channel(16);
    let handler = handler_fn(move |conn: Box<dyn StreamConn>| {
        let tx = tx.clone();
        async move {
            tx.send(conn)
                .await
                .map_err(|_| anyhow::anyhow!("test receiver dropped"))
        }
    });
    (Arc::new(handler), rx)
}

/// A quinn client configuration trusting only `cert`.
pub fn client_config(cert: &GeneratedCert, alpn: &[u8]) -> quinn::ClientConfig {
    tls::install_crypto_provider();
    let mut roots = rustls::RootCertStore::empty();
    roots
        .add(CertificateDer::from(cert.cert_der.clone()))
        .unwrap();
    let mut tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    tls_config.alpn_protocols = vec![alpn.to_vec()];

    let crypto = quinn::crypto::rustls::QuicClientConfig::try_from(tls_config).unwrap();
    quinn::ClientConfig::new(Arc::new(crypto))
}

/// A quinn client configuration that accepts any server certificate.
pub fn insecure_client_config() -> quinn::ClientConfig {
    tls::install_crypto_provider();
    let mut tls_config = rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(SkipServerVerification))
        .with_no_client_auth();
    tls_config.alpn_protocols = vec![tls::ALPN_H3.to_vec()];

    let crypto = quinn::crypto::rustls::QuicClientConfig::try_from(tls_config).unwrap();
    quinn::ClientConfig::new(Arc::new(crypto))
}

#[derive(Debug)]
struct SkipServerVerification;

impl rustls::client::danger::ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Wait until `transport` has bound and return its address.
pub async fn wait_for_addr(transport: &QuicTransport) -> SocketAddr {
    tokio::time::timeout(TIMEOUT, async {
        loop {
            if let Some(addr) = transport.local_addr() {
                return addr;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("transport did not bind")
}

pub fn client_endpoint() -> quinn::Endpoint {
    quinn::Endpoint::client("127.0.0.1:0".parse().unwrap()).unwrap()
}

/// Connect to `server` with the given client configuration.
///
/// The client endpoint is returned alongside the connection so it outlives
/// the test body.
pub async fn connect_with(
    server: &TestServer,
    config: quinn::ClientConfig,
) -> (quinn::Endpoint, quinn::Connection) {
    let endpoint = client_endpoint();
    let conn = endpoint
        .connect_with(config, server.addr, "localhost")
        .unwrap()
        .await
        .unwrap();
    (endpoint, conn)
}

pub async fn connect(server: &TestServer) -> (quinn::Endpoint, quinn::Connection) {
    connect_with(server, client_config(&server.cert, tls::ALPN_H3)).await
}

/// Receive the next connection handed to a [`channel_handler`].
pub async fn next_conn(rx: &mut mpsc::Receiver<Box<dyn StreamConn>>) -> Box<dyn StreamConn> {
    tokio::time::timeout(TIMEOUT, rx.recv())
        .await
        .expect("no connection dispatched in time")
        .expect("handler channel closed")
}
