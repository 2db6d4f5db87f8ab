//! An HTTP/3 server and client over loopback QUIC.

#![allow(dead_code)]

use std::net::{SocketAddr, UdpSocket};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Buf, Bytes};
use http::StatusCode;
use portico_certgen::GeneratedCert;
use portico_core::{Core, CtxPool, RequestContext};
use portico_http3::{Http3Options, Http3Server};
use portico_quic::{tls, QuicTransport};
use rustls::pki_types::CertificateDer;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// What the core saw of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seen {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub x: Option<String>,
    pub host: Option<String>,
    pub body: Vec<u8>,
}

/// A core that records each request and answers `201` with the body echoed
/// back behind a `created:` prefix. `/panic` panics inside the core.
pub struct RecordingCore {
    pub pool: Arc<CtxPool>,
    pub seen: Mutex<Vec<Seen>>,
}

impl RecordingCore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pool: Arc::new(CtxPool::new(8)),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Core for RecordingCore {
    fn ctx_pool(&self) -> Arc<CtxPool> {
        Arc::clone(&self.pool)
    }

    async fn serve_http(&self, ctx: &mut RequestContext) {
        let req = &ctx.request;
        assert_ne!(req.path(), "/panic", "core panicked on purpose");

        self.seen.lock().unwrap().push(Seen {
            method: req.method.to_string(),
            path: req.path().to_owned(),
            query: req.query().map(str::to_owned),
            x: req.header("x").map(str::to_owned),
            host: req.header("host").map(str::to_owned),
            body: req.body().to_vec(),
        });

        let mut body = b"created:".to_vec();
        body.extend_from_slice(ctx.request.body());
        ctx.response.set_status(StatusCode::CREATED);
        ctx.response.add_header("x-served-by", "portico");
        ctx.response.add_header("connection", "close");
        ctx.response.set_body(body);
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct TestServer {
    pub transport: Arc<QuicTransport>,
    pub addr: SocketAddr,
    pub cert: GeneratedCert,
}

/// Serve `core` over HTTP/3 on an ephemeral loopback port.
pub fn start_server(core: Arc<RecordingCore>, options: Http3Options) -> TestServer {
    init_tracing();
    let cert = portico_certgen::generate_certificate("localhost").unwrap();
    let tls_config = tls::server_config(&cert.cert_pem, &cert.key_pem).unwrap();

    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = socket.local_addr().unwrap();

    let transport = Arc::new(QuicTransport::new(addr.to_string(), None));
    transport
        .set_handler(Arc::new(Http3Server::with_options(core, options)))
        .unwrap();

    tokio::spawn({
        let transport = Arc::clone(&transport);
        async move { transport.serve_conn(Some(tls_config), Some(socket)).await }
    });

    TestServer {
        transport,
        addr,
        cert,
    }
}

pub fn client_config(cert: &GeneratedCert) -> quinn::ClientConfig {
    tls::install_crypto_provider();
    let mut roots = rustls::RootCertStore::empty();
    roots
        .add(CertificateDer::from(cert.cert_der.clone()))
        .unwrap();
    let mut tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    tls_config.alpn_protocols = vec![tls::ALPN_H3.to_vec()];

    let crypto = quinn::crypto::rustls::QuicClientConfig::try_from(tls_config).unwrap();
    quinn::ClientConfig::new(Arc::new(crypto))
}

/// An HTTP/3 client connected to `server`.
pub struct Client {
    pub endpoint: quinn::Endpoint,
    pub send_request: h3::client::SendRequest<h3_quinn::OpenStreams, Bytes>,
    pub driver: JoinHandle<()>,
}

pub async fn connect(server: &TestServer) -> Client {
    let endpoint = quinn::Endpoint::client("127.0.0.1:0".parse().unwrap()).unwrap();
    let conn = endpoint
        .connect_with(client_config(&server.cert), server.addr, "localhost")
        .unwrap()
        .await
        .unwrap();

    let (mut driver, send_request) = h3::client::new(h3_quinn::Connection::new(conn))
        .await
        .unwrap();
    let driver = tokio::spawn(async move {
        let _ = std::future::poll_fn(|cx| driver.poll_close(cx)).await;
    });

    Client {
        endpoint,
        send_request,
        driver,
    }
}

/// Send `request` with `body` and collect the response.
pub async fn roundtrip(
    client: &mut Client,
    request: http::Request<()>,
    body: &'static [u8],
) -> Result<(http::Response<()>, Vec<u8>), h3::Error> {
    let mut stream = client.send_request.send_request(request).await?;
    if !body.is_empty() {
        stream.send_data(Bytes::from_static(body)).await?;
    }
    // The server may stop reading early; the response still arrives.
    let _ = stream.finish().await;

    let response = stream.recv_response().await?;
    let mut received = Vec::new();
    while let Some(mut chunk) = stream.recv_data().await? {
        let len = chunk.remaining();
        received.extend_from_slice(&chunk.copy_to_bytes(len));
    }
    Ok((response, received))
}

/// Wait until every context the pool created is idle again.
pub async fn wait_for_pool(pool: &CtxPool) {
    tokio::time::timeout(TIMEOUT, async {
        while pool.idle() < pool.created() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("contexts were not returned to the pool");
}
