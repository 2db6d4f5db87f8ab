//! Byte streams carried by a multiplexed connection.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{ApplicationError, NetworkError};

/// The receive half of a stream.
pub trait ReceiveStream: AsyncRead + Send + Unpin {
    /// Protocol stream identifier.
    fn stream_id(&self) -> i64;

    /// Abruptly stop receiving, asking the peer to stop sending with `err`.
    fn cancel_read(&mut self, err: &ApplicationError) -> Result<(), NetworkError>;
}

/// The send half of a stream.
pub trait SendStream: AsyncWrite + Send + Unpin {
    /// Protocol stream identifier.
    fn stream_id(&self) -> i64;

    /// Abruptly terminate sending, signalling `err` to the peer.
    fn cancel_write(&mut self, err: &ApplicationError) -> Result<(), NetworkError>;
}

/// A bidirectional stream.
///
/// Both directions share a single identifier.
pub trait Stream: AsyncRead + AsyncWrite + Send + Unpin {
    fn stream_id(&self) -> i64;

    fn cancel_read(&mut self, err: &ApplicationError) -> Result<(), NetworkError>;

    fn cancel_write(&mut self, err: &ApplicationError) -> Result<(), NetworkError>;
}
