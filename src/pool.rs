//! Reusable exchange contexts.
//!
//! Contexts carry buffers worth keeping between exchanges (header strings,
//! the scope map's table), so the peer keeps released ones on a free list
//! instead of dropping them. A context leaves the pool wrapped in a
//! [`PooledContext`] guard, already reset against the session it serves, and
//! goes back when the guard is released or dropped. Either way it is freed
//! first, so an idle context never pins a session, handler or body.
//!
//! # Example
//!
//! ```ignore
//! let pool = ContextPool::new(PoolConfig::default());
//!
//! let mut ctx = pool.acquire(&session);
//! let reply = ctx.serve_frame(&frame)?;
//! pool.release(ctx);
//! ```

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::handler::Context;
use crate::session::Session;

/// Default number of idle contexts kept for reuse.
pub const DEFAULT_MAX_IDLE_CONTEXTS: usize = 1024;

/// Pool configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Idle contexts kept on the free list; extra releases are dropped.
    pub max_idle: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle: DEFAULT_MAX_IDLE_CONTEXTS,
        }
    }
}

/// Free list of exchange contexts.
#[derive(Debug)]
pub struct ContextPool {
    idle: Mutex<Vec<Box<Context>>>,
    config: PoolConfig,
    closed: AtomicBool,
    next_slot: AtomicU64,
    in_use: AtomicUsize,
}

impl ContextPool {
    /// Create an empty pool.
    pub fn new(config: PoolConfig) -> Arc<Self> {
        Arc::new(Self {
            idle: Mutex::new(Vec::with_capacity(config.max_idle.min(64))),
            config,
            closed: AtomicBool::new(false),
            next_slot: AtomicU64::new(1),
            in_use: AtomicUsize::new(0),
        })
    }

    /// Take a context bound to `session`.
    ///
    /// The session's public data is already copied into the context when this
    /// returns.
    pub fn acquire(self: &Arc<Self>, session: &Arc<Session>) -> PooledContext {
        let reused = self.idle.lock().pop();
        let mut ctx = match reused {
            Some(ctx) => ctx,
            None => {
                let slot = self.next_slot.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Creating context slot {}", slot);
                Box::new(Context::new(slot))
            }
        };
        ctx.reset(session);
        self.in_use.fetch_add(1, Ordering::Relaxed);

        PooledContext {
            ctx: Some(ctx),
            pool: Arc::clone(self),
        }
    }

    /// Return a context to the pool.
    ///
    /// Same as dropping the guard.
    pub fn release(&self, ctx: PooledContext) {
        drop(ctx);
    }

    fn put_back(&self, mut ctx: Box<Context>) {
        ctx.free();
        self.in_use.fetch_sub(1, Ordering::Relaxed);

        if self.closed.load(Ordering::Acquire) {
            tracing::trace!("Pool closed, dropping context slot {}", ctx.slot());
            return;
        }
        let mut idle = self.idle.lock();
        if idle.len() >= self.config.max_idle {
            tracing::trace!("Pool full, evicting context slot {}", ctx.slot());
            return;
        }
        idle.push(ctx);
    }

    /// Number of contexts waiting for reuse.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    /// Number of contexts currently handed out.
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Relaxed)
    }

    /// Number of contexts ever created by this pool.
    pub fn created(&self) -> u64 {
        self.next_slot.load(Ordering::Relaxed) - 1
    }

    /// Pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Drop every idle context. Contexts released afterwards are dropped too.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        let drained = std::mem::take(&mut *self.idle.lock());
        tracing::debug!("Context pool shut down, dropped {} idle", drained.len());
    }

    /// Check if [`shutdown`](Self::shutdown) was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// A context on loan from a [`ContextPool`].
///
/// Derefs to [`Context`]. Dropping the guard returns the context.
pub struct PooledContext {
    ctx: Option<Box<Context>>,
    pool: Arc<ContextPool>,
}

impl PooledContext {
    /// Return the context to its pool now.
    pub fn release(self) {
        drop(self);
    }
}

impl Deref for PooledContext {
    type Target = Context;

    fn deref(&self) -> &Context {
        match &self.ctx {
            Some(ctx) => ctx,
            None => unreachable!("pooled context already returned"),
        }
    }
}

impl DerefMut for PooledContext {
    fn deref_mut(&mut self) -> &mut Context {
        match &mut self.ctx {
            Some(ctx) => ctx,
            None => unreachable!("pooled context already returned"),
        }
    }
}

impl Drop for PooledContext {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.pool.put_back(ctx);
        }
    }
}

impl std::fmt::Debug for PooledContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PooledContext").field(&self.ctx).finish()
    }
}
