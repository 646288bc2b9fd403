//! The engine: shared host state and the public execution API.
//!
//! An [`Engine`] is a cheap, cloneable handle. Every clone sees the same
//! context pool, native registry, and heap, so a generator can keep the
//! engine that created it alive for as long as it holds a context.

use crate::builtins;
use crate::bytecode::Procedure;
use crate::config::EngineConfig;
use crate::context::Context;
use crate::dispatch::{self, ExecutionOutcome, Runtime};
use crate::error::{RuntimeError, VmResult};
use crate::generators;
use crate::heap::Heap;
use crate::native::{NativeFn, NativeRegistry};
use crate::pool::{ContextPool, PoolStats};
use cogen_core::Value;
use std::sync::Arc;

struct EngineInner {
    config: EngineConfig,
    pool: ContextPool,
    natives: NativeRegistry,
    heap: Heap,
}

/// Host engine handle.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Create an engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with a custom configuration.
    ///
    /// Builtins and generator support are registered up front.
    pub fn with_config(config: EngineConfig) -> Self {
        let engine = Self {
            inner: Arc::new(EngineInner {
                pool: ContextPool::new(config.max_contexts),
                natives: NativeRegistry::new(),
                heap: Heap::new(),
                config,
            }),
        };
        builtins::register_builtins(&engine);
        generators::register_generator_support(&engine);
        tracing::debug!(
            max_contexts = engine.inner.config.max_contexts,
            natives = engine.inner.natives.len(),
            "engine created"
        );
        engine
    }

    /// Active configuration.
    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // =========================================================================
    // Context Pool
    // =========================================================================

    /// Check out a context and prepare it to run `procedure` with `args`.
    ///
    /// On failure nothing stays checked out.
    pub fn acquire(&self, procedure: Arc<Procedure>, args: &[Value]) -> VmResult<Context> {
        let mut context = self.inner.pool.take().map_err(|err| {
            tracing::warn!(
                capacity = self.inner.config.max_contexts,
                procedure = %procedure.name,
                "context pool exhausted"
            );
            err
        })?;

        let name = procedure.name.clone();
        if let Err(err) = context.prepare(procedure, args) {
            self.inner.pool.give_back(context);
            return Err(err);
        }
        tracing::debug!(context = %context.id(), procedure = %name, "context acquired");
        Ok(context)
    }

    /// Return a context to the pool. Frames and any generator link are dropped.
    pub fn release(&self, context: Context) {
        tracing::debug!(context = %context.id(), state = %context.state(), "context released");
        self.inner.pool.give_back(context);
    }

    /// Pool accounting.
    #[inline]
    pub fn pool_stats(&self) -> PoolStats {
        self.inner.pool.stats()
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Run `context` until it suspends, returns, or faults.
    pub fn execute(&self, context: &mut Context) -> ExecutionOutcome {
        let rt = Runtime {
            config: &self.inner.config,
            natives: &self.inner.natives,
            heap: &self.inner.heap,
        };
        let outcome = dispatch::execute(context, &rt);
        if let ExecutionOutcome::Faulted(err) = &outcome {
            tracing::warn!(context = %context.id(), error = %err, "procedure faulted");
        }
        outcome
    }

    /// Run an ordinary procedure to completion on a pooled context.
    ///
    /// Fails if the procedure faults, or if it tries to suspend (`yield` is
    /// rejected here since the context is not owned by a generator).
    pub fn call(&self, procedure: Arc<Procedure>, args: &[Value]) -> VmResult<Value> {
        let mut context = self.acquire(procedure, args)?;
        let outcome = self.execute(&mut context);
        self.release(context);
        match outcome {
            ExecutionOutcome::Completed(value) => Ok(value),
            ExecutionOutcome::Faulted(err) => Err(err),
            ExecutionOutcome::Suspended => Err(RuntimeError::internal(
                "procedure suspended outside a generator",
            )),
        }
    }

    // =========================================================================
    // Natives & Heap
    // =========================================================================

    /// Register a native function, replacing any previous binding.
    pub fn register_native(&self, name: &str, function: NativeFn) {
        if self.inner.natives.register(name, function).is_some() {
            tracing::trace!(native = name, "native rebound");
        }
    }

    /// Returns true if `name` is registered.
    #[inline]
    pub fn has_native(&self, name: &str) -> bool {
        self.inner.natives.contains(name)
    }

    /// Allocation tracker for objects created by running code.
    #[inline]
    pub fn heap(&self) -> &Heap {
        &self.inner.heap
    }

    /// Returns true if both handles refer to the same engine.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.inner.config)
            .field("pool", &self.inner.pool)
            .field("natives", &self.inner.natives)
            .finish()
    }
}
