//! Multiplexed stream connections.

use std::any::Any;
use std::net::SocketAddr;

use async_trait::async_trait;

use crate::error::{ApplicationError, NetworkError};
use crate::stream::{ReceiveStream, SendStream, Stream};

/// A connection that carries multiple independent streams.
///
/// Operations that wait (`accept_*`, `open_*_sync`) are cancelled by
/// dropping the returned future, e.g. through `tokio::time::timeout` or
/// `tokio::select!`.
#[async_trait]
pub trait StreamConn: Send + Sync {
    /// Wait for the peer to open a bidirectional stream.
    async fn accept_stream(&self) -> Result<Box<dyn Stream>, NetworkError>;

    /// Wait for the peer to open a unidirectional stream.
    async fn accept_uni_stream(&self) -> Result<Box<dyn ReceiveStream>, NetworkError>;

    /// Open a bidirectional stream without waiting for stream credit.
    ///
    /// Fails with [`NetworkError::TooManyOpenStreams`] if the peer's limit
    /// is exhausted.
    fn open_stream(&self) -> Result<Box<dyn Stream>, NetworkError>;

    /// Open a bidirectional stream, waiting for stream credit if necessary.
    async fn open_stream_sync(&self) -> Result<Box<dyn Stream>, NetworkError>;

    /// Open a unidirectional stream without waiting for stream credit.
    fn open_uni_stream(&self) -> Result<Box<dyn SendStream>, NetworkError>;

    /// Open a unidirectional stream, waiting for stream credit if necessary.
    async fn open_uni_stream_sync(&self) -> Result<Box<dyn SendStream>, NetworkError>;

    /// Close the connection immediately, sending `err` and `message` to the peer.
    fn close_with_error(&self, err: &ApplicationError, message: &str) -> Result<(), NetworkError>;

    /// The backend connection this adapter wraps.
    ///
    /// Use [`raw_connection_as`] to recover it with its concrete type.
    fn raw_connection(&self) -> &(dyn Any + Send + Sync);

    /// The negotiated wire version, if the backend can report it.
    fn version(&self) -> Option<u32> {
        None
    }

    fn remote_addr(&self) -> SocketAddr;
}

/// Recover the backend connection of `conn` as a `T`.
///
/// Returns `None` when the connection was produced by a different backend.
pub fn raw_connection_as<T: Any>(conn: &dyn StreamConn) -> Option<&T> {
    conn.raw_connection().downcast_ref::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A connection with no streams, only a raw handle.
    struct Detached {
        raw: String,
    }

    #[async_trait]
    impl StreamConn for Detached {
        async fn accept_stream(&self) -> Result<Box<dyn Stream>, NetworkError> {
            Err(NetworkError::TooManyOpenStreams)
        }

        async fn accept_uni_stream(&self) -> Result<Box<dyn ReceiveStream>, NetworkError> {
            Err(NetworkError::TooManyOpenStreams)
        }

        fn open_stream(&self) -> Result<Box<dyn Stream>, NetworkError> {
            Err(NetworkError::TooManyOpenStreams)
        }

        async fn open_stream_sync(&self) -> Result<Box<dyn Stream>, NetworkError> {
            Err(NetworkError::TooManyOpenStreams)
        }

        fn open_uni_stream(&self) -> Result<Box<dyn SendStream>, NetworkError> {
            Err(NetworkError::TooManyOpenStreams)
        }

        async fn open_uni_stream_sync(&self) -> Result<Box<dyn SendStream>, NetworkError> {
            Err(NetworkError::TooManyOpenStreams)
        }

        fn close_with_error(
            &self,
            _err: &ApplicationError,
            _message: &str,
        ) -> Result<(), NetworkError> {
            Ok(())
        }

        fn raw_connection(&self) -> &(dyn Any + Send + Sync) {
            &self.raw
        }

        fn remote_addr(&self) -> SocketAddr {
            SocketAddr::from(([127, 0, 0, 1], 0))
        }
    }

    #[test]
    fn raw_connection_downcasts_to_concrete_type() {
        let conn = Detached {
            raw: "backend".to_string(),
        };
        let raw = raw_connection_as::<String>(&conn);
        assert_eq!(raw.map(String::as_str), Some("backend"));
    }

    #[test]
    fn raw_connection_rejects_other_types() {
        let conn = Detached {
            raw: "backend".to_string(),
        };
        assert!(raw_connection_as::<u64>(&conn).is_none());
    }

    #[test]
    fn version_is_optional() {
        let conn = Detached { raw: String::new() };
        assert_eq!(conn.version(), None);
    }
}
