//! HTTP/3 server for portico.
//!
//! [`Http3Server`] is a connection handler: given a QUIC connection from
//! `portico-quic`, it runs the `h3` server on it and dispatches every
//! request into a [`portico_core::Core`], using request contexts from the
//! core's pool.

pub mod adaptor;
pub mod error;
pub mod server;

pub use error::Http3Error;
pub use server::{Http3Options, Http3Server, DEFAULT_MAX_BODY_SIZE};
