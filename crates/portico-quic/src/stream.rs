//! quinn streams behind the portico stream traits.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use portico_network::{ApplicationError, NetworkError, ReceiveStream, SendStream, Stream};
use quinn::{StreamId, VarInt};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Translate an application error into a QUIC error code.
///
/// Codes above the varint range (2^62 - 1) saturate to `VarInt::MAX`.
pub fn error_code(err: &ApplicationError) -> VarInt {
    VarInt::from_u64(err.code()).unwrap_or(VarInt::MAX)
}

fn stream_id(id: StreamId) -> i64 {
    // stream ids are varints and always fit
    i64::try_from(VarInt::from(id).into_inner()).unwrap_or(i64::MAX)
}

/// The receive side of a QUIC stream.
#[derive(Debug)]
pub struct QuicRecvStream {
    inner: quinn::RecvStream,
}

impl QuicRecvStream {
    pub fn new(inner: quinn::RecvStream) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> quinn::RecvStream {
        self.inner
    }
}

impl ReceiveStream for QuicRecvStream {
    fn stream_id(&self) -> i64 {
        stream_id(self.inner.id())
    }

    fn cancel_read(&mut self, err: &ApplicationError) -> Result<(), NetworkError> {
        self.inner
            .stop(error_code(err))
            .map_err(NetworkError::native)
    }
}

impl AsyncRead for QuicRecvStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        AsyncRead::poll_read(Pin::new(&mut self.get_mut().inner), cx, buf)
    }
}

/// The send side of a QUIC stream.
#[derive(Debug)]
pub struct QuicSendStream {
    inner: quinn::SendStream,
}

impl QuicSendStream {
    pub fn new(inner: quinn::SendStream) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> quinn::SendStream {
        self.inner
    }
}

impl SendStream for QuicSendStream {
    fn stream_id(&self) -> i64 {
        stream_id(self.inner.id())
    }

    fn cancel_write(&mut self, err: &ApplicationError) -> Result<(), NetworkError> {
        self.inner
            .reset(error_code(err))
            .map_err(NetworkError::native)
    }
}

impl AsyncWrite for QuicSendStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        AsyncWrite::poll_write(Pin::new(&mut self.get_mut().inner), cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        AsyncWrite::poll_flush(Pin::new(&mut self.get_mut().inner), cx)
    }

    /// Finishes the stream.
    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        AsyncWrite::poll_shutdown(Pin::new(&mut self.get_mut().inner), cx)
    }
}

/// A bidirectional QUIC stream, composed of its two halves.
#[derive(Debug)]
pub struct QuicStream {
    recv: QuicRecvStream,
    send: QuicSendStream,
}

impl QuicStream {
    /// Pair the halves quinn returns for one bidirectional stream.
    pub fn new(send: quinn::SendStream, recv: quinn::RecvStream) -> Self {
        let stream = Self {
            recv: QuicRecvStream::new(recv),
            send: QuicSendStream::new(send),
        };
        debug_assert_eq!(
            ReceiveStream::stream_id(&stream.recv),
            SendStream::stream_id(&stream.send),
            "halves of one stream must share its id"
        );
        stream
    }

    pub fn into_split(self) -> (QuicRecvStream, QuicSendStream) {
        (self.recv, self.send)
    }
}

impl Stream for QuicStream {
    /// Both halves report the same id; the send side answers.
    fn stream_id(&self) -> i64 {
        self.send.stream_id()
    }

    fn cancel_read(&mut self, err: &ApplicationError) -> Result<(), NetworkError> {
        self.recv.cancel_read(err)
    }

    fn cancel_write(&mut self, err: &ApplicationError) -> Result<(), NetworkError> {
        self.send.cancel_write(err)
    }
}

impl AsyncRead for QuicStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().recv).poll_read(cx, buf)
    }
}

impl AsyncWrite for QuicStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().send).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().send).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().send).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_in_range_are_carried_exactly() {
        for code in [0, 1, 0x100, 0x10c, u64::from(u32::MAX), (1 << 62) - 1] {
            let err = ApplicationError::new(code, "test");
            assert_eq!(error_code(&err).into_inner(), code);
        }
    }

    #[test]
    fn codes_beyond_varint_range_saturate() {
        let err = ApplicationError::new(u64::MAX, "too big");
        assert_eq!(error_code(&err), VarInt::MAX);
        let err = ApplicationError::new(1 << 62, "just over");
        assert_eq!(error_code(&err), VarInt::MAX);
    }
}
