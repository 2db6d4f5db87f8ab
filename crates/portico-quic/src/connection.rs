//! quinn connections behind the portico connection trait.

use std::any::Any;
use std::net::SocketAddr;

use async_trait::async_trait;
use futures::FutureExt;
use portico_network::{
    ApplicationError, NetworkError, ReceiveStream, SendStream, Stream, StreamConn,
};

use crate::stream::{error_code, QuicRecvStream, QuicSendStream, QuicStream};

/// QUIC version 1 (RFC 9000), the only version portico endpoints accept.
pub const QUIC_VERSION_1: u32 = 0x0000_0001;

/// An accepted or established QUIC connection.
///
/// The wrapped [`quinn::Connection`] is exposed as the raw connection, so
/// protocol servers that drive quinn directly (such as HTTP/3) can recover
/// it with [`portico_network::raw_connection_as`].
#[derive(Debug, Clone)]
pub struct QuicConn {
    conn: quinn::Connection,
    version: Option<u32>,
}

impl QuicConn {
    /// Wrap a connection whose QUIC version is not known.
    pub fn new(conn: quinn::Connection) -> Self {
        Self {
            conn,
            version: None,
        }
    }

    /// Wrap a connection negotiated at a known QUIC version.
    pub fn with_version(conn: quinn::Connection, version: u32) -> Self {
        Self {
            conn,
            version: Some(version),
        }
    }

    pub fn connection(&self) -> &quinn::Connection {
        &self.conn
    }
}

#[async_trait]
impl StreamConn for QuicConn {
    async fn accept_stream(&self) -> Result<Box<dyn Stream>, NetworkError> {
        let (send, recv) = self.conn.accept_bi().await.map_err(NetworkError::native)?;
        Ok(Box::new(QuicStream::new(send, recv)))
    }

    async fn accept_uni_stream(&self) -> Result<Box<dyn ReceiveStream>, NetworkError> {
        let recv = self.conn.accept_uni().await.map_err(NetworkError::native)?;
        Ok(Box::new(QuicRecvStream::new(recv)))
    }

    fn open_stream(&self) -> Result<Box<dyn Stream>, NetworkError> {
        let (send, recv) = self
            .conn
            .open_bi()
            .now_or_never()
            .ok_or(NetworkError::TooManyOpenStreams)?
            .map_err(NetworkError::native)?;
        Ok(Box::new(QuicStream::new(send, recv)))
    }

    async fn open_stream_sync(&self) -> Result<Box<dyn Stream>, NetworkError> {
        let (send, recv) = self.conn.open_bi().await.map_err(NetworkError::native)?;
        Ok(Box::new(QuicStream::new(send, recv)))
    }

    fn open_uni_stream(&self) -> Result<Box<dyn SendStream>, NetworkError> {
        let send = self
            .conn
            .open_uni()
            .now_or_never()
            .ok_or(NetworkError::TooManyOpenStreams)?
            .map_err(NetworkError::native)?;
        Ok(Box::new(QuicSendStream::new(send)))
    }

    async fn open_uni_stream_sync(&self) -> Result<Box<dyn SendStream>, NetworkError> {
        let send = self.conn.open_uni().await.map_err(NetworkError::native)?;
        Ok(Box::new(QuicSendStream::new(send)))
    }

    fn close_with_error(&self, err: &ApplicationError, message: &str) -> Result<(), NetworkError> {
        self.conn.close(error_code(err), message.as_bytes());
        Ok(())
    }

    fn raw_connection(&self) -> &(dyn Any + Send + Sync) {
        &self.conn
    }

    fn version(&self) -> Option<u32> {
        self.version
    }

    fn remote_addr(&self) -> SocketAddr {
        self.conn.remote_address()
    }
}
