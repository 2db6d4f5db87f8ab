//! QUIC transport for portico.
//!
//! Adapts quinn to the `portico-network` abstractions: [`QuicTransport`]
//! binds an endpoint and dispatches accepted connections, [`QuicConn`]
//! implements `StreamConn`, and [`QuicStream`], [`QuicRecvStream`] and
//! [`QuicSendStream`] implement the stream traits. TLS is provided by rustls.

pub mod config;
pub mod connection;
pub mod error;
pub mod stream;
pub mod tls;
pub mod transport;

pub use config::{QuicTuning, TransportOptions, DEFAULT_ADDR};
pub use connection::{QuicConn, QUIC_VERSION_1};
pub use error::TransportError;
pub use stream::{QuicRecvStream, QuicSendStream, QuicStream};
pub use transport::{QuicTransport, TransportState, TransportStats};
