//! Request core for portico.
//!
//! The [`Core`] trait is the entry point protocol servers dispatch requests
//! into. Requests travel in a [`RequestContext`] taken from the core's
//! [`CtxPool`] and handed back once the response has been written.

pub mod context;
pub mod pool;
pub mod service;

pub use context::{Request, RequestContext, Response};
pub use pool::{CtxPool, PooledCtx, DEFAULT_MAX_IDLE};
pub use service::Core;
