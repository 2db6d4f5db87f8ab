//! Transport errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("not support quic without tls")]
    TlsRequired,

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("failed to read {path}: {source}")]
    CertificateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid bind address {addr:?}: {reason}")]
    Address { addr: String, reason: String },

    #[error("invalid QUIC configuration: {0}")]
    Config(String),

    #[error("failed to bind QUIC endpoint: {0}")]
    Bind(#[source] std::io::Error),

    #[error("QUIC endpoint closed")]
    EndpointClosed,

    #[error("transport is already serving")]
    AlreadyServing,

    #[error("no connection handler registered")]
    NoHandler,

    #[error(transparent)]
    Certgen(#[from] portico_certgen::CertgenError),
}
