//! Transport abstractions for portico.
//!
//! This crate defines the interfaces a transport backend must satisfy to be
//! driven by the portico server: [`Transporter`] binds and accepts,
//! [`StreamConn`] is a multiplexed connection, and [`Stream`],
//! [`ReceiveStream`] and [`SendStream`] are the byte streams it carries.
//! The QUIC backend lives in `portico-quic`.

pub mod conn;
pub mod error;
pub mod handler;
pub mod stream;

pub use conn::{raw_connection_as, StreamConn};
pub use error::{ApplicationError, NetworkError};
pub use handler::{handler_fn, ConnHandler, FnHandler, Transporter};
pub use stream::{ReceiveStream, SendStream, Stream};
