//! HTTP/3 server errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Http3Error {
    #[error("http3: cannot convert raw connection to a quinn connection")]
    UnsupportedConnection,

    #[error("HTTP/3 error: {0}")]
    H3(#[from] h3::Error),
}
