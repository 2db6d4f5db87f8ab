//! Pool of reusable request contexts.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::trace;

use crate::context::RequestContext;

/// Idle contexts kept by [`CtxPool::default`].
pub const DEFAULT_MAX_IDLE: usize = 1024;

/// A concurrency-safe pool of [`RequestContext`]s.
///
/// Contexts are handed out as [`PooledCtx`] guards, which reset the context
/// and return it when dropped. At most `max_idle` contexts are retained;
/// extra ones are freed.
#[derive(Debug)]
pub struct CtxPool {
    idle: Mutex<Vec<RequestContext>>,
    max_idle: usize,
    created: AtomicUsize,
}

impl CtxPool {
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
            created: AtomicUsize::new(0),
        }
    }

    /// Take a context from the pool, allocating one if none is idle.
    pub fn get(self: &Arc<Self>) -> PooledCtx {
        let reused = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        let ctx = reused.unwrap_or_else(|| {
            self.created.fetch_add(1, Ordering::Relaxed);
            RequestContext::new()
        });
        PooledCtx {
            ctx,
            pool: Arc::clone(self),
        }
    }

    /// Reset `ctx` and keep it for reuse.
    pub fn put(&self, mut ctx: RequestContext) {
        ctx.reset();
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(ctx);
        } else {
            trace!(max_idle = self.max_idle, "context pool full, dropping context");
        }
    }

    /// Number of contexts currently waiting in the pool.
    pub fn idle(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of contexts allocated by this pool so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

impl Default for CtxPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDLE)
    }
}

/// A context checked out of a [`CtxPool`].
///
/// Dropping the guard returns the context, on every exit path including
/// unwinding.
#[derive(Debug)]
pub struct PooledCtx {
    ctx: RequestContext,
    pool: Arc<CtxPool>,
}

impl Deref for PooledCtx {
    type Target = RequestContext;

    fn deref(&self) -> &RequestContext {
        &self.ctx
    }
}

impl DerefMut for PooledCtx {
    fn deref_mut(&mut self) -> &mut RequestContext {
        &mut self.ctx
    }
}

impl Drop for PooledCtx {
    fn drop(&mut self) {
        self.pool.put(std::mem::take(&mut self.ctx));
    }
}
