//! Context pool.
//!
//! Contexts are recycled rather than rebuilt: a released context keeps its
//! frame vector allocation and goes back on the idle list. The pool caps how
//! many contexts may be checked out at once.

use crate::context::{Context, ContextId};
use crate::error::{RuntimeError, VmResult};
use parking_lot::Mutex;

/// Pool accounting snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Maximum contexts checked out at once.
    pub capacity: usize,
    /// Contexts currently checked out.
    pub in_use: usize,
    /// Released contexts waiting for reuse.
    pub idle: usize,
    /// Successful acquisitions since creation.
    pub acquired: u64,
    /// Releases since creation.
    pub released: u64,
    /// Highest `in_use` observed.
    pub peak: usize,
}

struct PoolInner {
    idle: Vec<Context>,
    in_use: usize,
    acquired: u64,
    released: u64,
    peak: usize,
    next_id: u64,
}

/// Bounded pool of reusable contexts.
pub struct ContextPool {
    capacity: usize,
    inner: Mutex<PoolInner>,
}

impl ContextPool {
    /// Create a pool allowing `capacity` contexts in use at once.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(PoolInner {
                idle: Vec::new(),
                in_use: 0,
                acquired: 0,
                released: 0,
                peak: 0,
                next_id: 1,
            }),
        }
    }

    /// Check out an idle context, creating one if none is waiting.
    pub fn take(&self) -> VmResult<Context> {
        let mut inner = self.inner.lock();
        if inner.in_use >= self.capacity {
            return Err(RuntimeError::pool_exhausted(self.capacity));
        }

        let context = match inner.idle.pop() {
            Some(context) => context,
            None => {
                let id = ContextId(inner.next_id);
                inner.next_id += 1;
                Context::new(id)
            }
        };
        inner.in_use += 1;
        inner.acquired += 1;
        inner.peak = inner.peak.max(inner.in_use);
        Ok(context)
    }

    /// Reset a context and put it back on the idle list.
    pub fn give_back(&self, mut context: Context) {
        context.reset();
        let mut inner = self.inner.lock();
        inner.in_use = inner.in_use.saturating_sub(1);
        inner.released += 1;
        inner.idle.push(context);
    }

    /// Current accounting.
    pub fn stats(&self) -> PoolStats {
        let inner = self.inner.lock();
        PoolStats {
            capacity: self.capacity,
            in_use: inner.in_use,
            idle: inner.idle.len(),
            acquired: inner.acquired,
            released: inner.released,
            peak: inner.peak,
        }
    }
}

impl std::fmt::Debug for ContextPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextPool")
            .field("stats", &self.stats())
            .finish()
    }
}
