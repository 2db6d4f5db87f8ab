//! TLS configuration for QUIC endpoints.

use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tracing::debug;

use crate::error::TransportError;

/// ALPN identifier of HTTP/3.
pub const ALPN_H3: &[u8] = b"h3";

/// Install ring as the process-wide rustls crypto provider, if no provider
/// has been installed yet.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Load a PEM certificate chain and private key from disk and build a TLS
/// configuration carrying only that certificate.
pub fn load_server_config(
    cert_file: &Path,
    key_file: &Path,
) -> Result<Arc<rustls::ServerConfig>, TransportError> {
    let cert_pem = read_pem(cert_file)?;
    let key_pem = read_pem(key_file)?;
    let config = server_config(&cert_pem, &key_pem)?;
    debug!(cert = %cert_file.display(), "loaded TLS certificate");
    Ok(config)
}

/// Build a TLS configuration from PEM-encoded cert and key.
pub fn server_config(
    cert_pem: &str,
    key_pem: &str,
) -> Result<Arc<rustls::ServerConfig>, TransportError> {
    install_crypto_provider();

    let certs = parse_certs(cert_pem)?;
    let key = parse_key(key_pem)?;

    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| TransportError::Tls(e.to_string()))?;
    Ok(Arc::new(config))
}

/// Build a TLS configuration around a freshly generated self-signed
/// certificate for `localhost`.
pub fn self_signed_server_config() -> Result<Arc<rustls::ServerConfig>, TransportError> {
    let cert = portico_certgen::generate_certificate("localhost")?;
    debug!(fingerprint = %cert.fingerprint, "generated self-signed certificate");
    server_config(&cert.cert_pem, &cert.key_pem)
}

/// Derive the quinn crypto configuration from a caller's TLS configuration.
///
/// The caller's configuration is copied, not modified. The copy advertises
/// HTTP/3 when no ALPN protocols were configured and accepts early data.
pub fn quic_server_crypto(
    tls: &rustls::ServerConfig,
) -> Result<quinn::crypto::rustls::QuicServerConfig, TransportError> {
    let mut tls = tls.clone();
    if tls.alpn_protocols.is_empty() {
        tls.alpn_protocols = vec![ALPN_H3.to_vec()];
    }
    // quinn only accepts 0-RTT with an unlimited early data size
    tls.max_early_data_size = u32::MAX;

    quinn::crypto::rustls::QuicServerConfig::try_from(tls)
        .map_err(|e| TransportError::Tls(e.to_string()))
}

fn read_pem(path: &Path) -> Result<String, TransportError> {
    std::fs::read_to_string(path).map_err(|source| TransportError::CertificateFile {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_certs(pem: &str) -> Result<Vec<CertificateDer<'static>>, TransportError> {
    let mut reader = std::io::BufReader::new(pem.as_bytes());
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TransportError::Tls(format!("failed to parse certificate PEM: {e}")))?;
    if certs.is_empty() {
        return Err(TransportError::Tls(
            "no certificates found in PEM".to_string(),
        ));
    }
    Ok(certs)
}

fn parse_key(pem: &str) -> Result<PrivateKeyDer<'static>, TransportError> {
    let mut reader = std::io::BufReader::new(pem.as_bytes());
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| TransportError::Tls(format!("failed to parse key PEM: {e}")))?
        .ok_or_else(|| TransportError::Tls("no private key found in PEM".to_string()))
}
