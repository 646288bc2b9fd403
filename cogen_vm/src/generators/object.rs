//! The generator object.
//!
//! A [`Generator`] owns one context for as long as its body can still run.
//! Each step resumes that context on the caller's thread until the body
//! yields or terminates. Termination on any path (return, fault, abort, or
//! the last handle being dropped) clears the context's link and gives it back
//! to the engine's pool exactly once.

use super::exchange::{ExchangeSlots, YieldLink};
use super::iterator::{GeneratorError, GeneratorIter};
use super::state::{GeneratorHeader, GeneratorState};
use crate::bytecode::Procedure;
use crate::context::Context;
use crate::dispatch::ExecutionOutcome;
use crate::heap::{CollectMode, HeapStats};
use crate::Engine;
use cogen_core::{Value, ValueHolder};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_GENERATOR_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique generator identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeneratorId(pub u64);

impl GeneratorId {
    fn next() -> Self {
        Self(NEXT_GENERATOR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// Diagnostic counters of one generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratorStats {
    /// Steps that executed the body.
    pub steps: u64,
    /// Heap objects allocated while the body ran.
    pub objects_created: u64,
    /// Heap objects reclaimed by the full collections this generator ran.
    pub objects_destroyed: u64,
}

/// The part of a generator only a stepping caller touches.
struct GeneratorCore {
    id: GeneratorId,
    engine: Engine,
    context: Option<Context>,
}

impl GeneratorCore {
    /// Unlink the context and return it to the pool.
    fn release_context(&mut self) -> bool {
        match self.context.take() {
            Some(mut context) => {
                context.clear_link();
                self.engine.release(context);
                true
            }
            None => false,
        }
    }
}

impl Drop for GeneratorCore {
    fn drop(&mut self) {
        if self.release_context() {
            tracing::debug!(generator = %self.id, "generator abandoned");
        }
    }
}

struct GeneratorShared {
    id: GeneratorId,
    header: GeneratorHeader,
    slots: Arc<ExchangeSlots>,
    steps: AtomicU64,
    objects_created: AtomicU64,
    objects_destroyed: AtomicU64,
    core: Mutex<GeneratorCore>,
}

/// A suspendable procedure driven one step at a time.
///
/// Cloning produces another handle to the same generator.
#[derive(Clone)]
pub struct Generator {
    shared: Arc<GeneratorShared>,
}

impl Generator {
    /// Create a generator running `procedure` with `argument` as its sole
    /// parameter.
    ///
    /// Fails without leaking a context if the pool is exhausted or the
    /// procedure does not take exactly one argument.
    pub fn new(
        engine: &Engine,
        procedure: Arc<Procedure>,
        argument: impl Into<Value>,
    ) -> Result<Self, GeneratorError> {
        let id = GeneratorId::next();
        let name = procedure.name.clone();
        let mut context = engine
            .acquire(procedure, &[argument.into()])
            .map_err(GeneratorError::Construction)?;

        let slots = Arc::new(ExchangeSlots::new());
        context.set_link(YieldLink::new(id, Arc::clone(&slots)));
        tracing::debug!(generator = %id, context = %context.id(), procedure = %name, "generator created");

        Ok(Self {
            shared: Arc::new(GeneratorShared {
                id,
                header: GeneratorHeader::new(),
                slots,
                steps: AtomicU64::new(0),
                objects_created: AtomicU64::new(0),
                objects_destroyed: AtomicU64::new(0),
                core: Mutex::new(GeneratorCore {
                    id,
                    engine: engine.clone(),
                    context: Some(context),
                }),
            }),
        })
    }

    /// Identifier, stable for the generator's lifetime.
    #[inline]
    pub fn id(&self) -> GeneratorId {
        self.shared.id
    }

    // =========================================================================
    // Stepping
    // =========================================================================

    /// Run the body until its next yield or its end, with nothing delivered.
    ///
    /// Returns `Ok(true)` if the body yielded and can be stepped again,
    /// `Ok(false)` once it has finished (and on every later call). A fault in
    /// the body completes the generator and is returned as
    /// [`GeneratorError::Fault`].
    pub fn step(&self) -> Result<bool, GeneratorError> {
        self.step_inner(None)
    }

    /// Like [`step`](Self::step), delivering `value` to the `yield` the body
    /// is suspended at.
    pub fn step_with(&self, value: impl Into<Value>) -> Result<bool, GeneratorError> {
        self.step_inner(Some(value.into()))
    }

    fn step_inner(&self, inbound: Option<Value>) -> Result<bool, GeneratorError> {
        let shared = &*self.shared;
        let mut core = shared
            .core
            .try_lock()
            .ok_or(GeneratorError::AlreadyRunning)?;
        if core.context.is_none() {
            return Ok(false);
        }
        if shared.header.try_start().is_none() {
            return Err(GeneratorError::AlreadyRunning);
        }

        shared.slots.deliver(inbound);
        let engine = core.engine.clone();
        let before = engine.heap().statistics();

        let outcome = match core.context.as_mut() {
            Some(context) => engine.execute(context),
            None => return Ok(false),
        };
        let steps = shared.steps.fetch_add(1, Ordering::Relaxed) + 1;

        let result = match outcome {
            ExecutionOutcome::Suspended => {
                shared.header.suspend();
                tracing::trace!(generator = %shared.id, steps, "generator suspended");
                Ok(true)
            }
            ExecutionOutcome::Completed(_) => {
                self.finish(&mut core);
                Ok(false)
            }
            ExecutionOutcome::Faulted(err) => {
                tracing::warn!(generator = %shared.id, error = %err, "generator body faulted");
                self.finish(&mut core);
                Err(GeneratorError::Fault(err))
            }
        };
        drop(core);

        if engine.config().collect_after_step {
            self.collect_garbage(&engine, before);
        }
        result
    }

    fn finish(&self, core: &mut MutexGuard<'_, GeneratorCore>) {
        core.release_context();
        self.shared.header.complete();
        tracing::debug!(
            generator = %self.shared.id,
            yields = self.shared.header.yields(),
            "generator completed"
        );
    }

    /// Account for objects the step allocated, then reclaim garbage: a full
    /// pass if anything was allocated, and always one incremental step.
    fn collect_garbage(&self, engine: &Engine, before: HeapStats) {
        let heap = engine.heap();
        let created = heap.statistics().allocated.saturating_sub(before.allocated);
        if created > 0 {
            self.shared
                .objects_created
                .fetch_add(created, Ordering::Relaxed);
            let destroyed = heap.collect(CollectMode::Full);
            self.shared
                .objects_destroyed
                .fetch_add(destroyed as u64, Ordering::Relaxed);
        }
        heap.collect(CollectMode::Step);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Snapshot of the most recently yielded value; empty if nothing has
    /// been yielded or the last yield carried no value.
    pub fn value(&self) -> ValueHolder {
        self.shared.slots.outbound().snapshot()
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> GeneratorState {
        self.shared.header.state()
    }

    /// Returns true once the body can no longer run.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.shared.header.is_completed()
    }

    /// Returns true while the generator holds a context.
    ///
    /// During a step the context is in use, which counts as held.
    pub fn has_context(&self) -> bool {
        match self.shared.core.try_lock() {
            Some(core) => core.context.is_some(),
            None => !self.is_completed(),
        }
    }

    /// Yields completed so far.
    #[inline]
    pub fn yields(&self) -> u32 {
        self.shared.header.yields()
    }

    /// Number of live handles to this generator.
    #[inline]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.shared)
    }

    /// Diagnostic counters.
    pub fn stats(&self) -> GeneratorStats {
        GeneratorStats {
            steps: self.shared.steps.load(Ordering::Relaxed),
            objects_created: self.shared.objects_created.load(Ordering::Relaxed),
            objects_destroyed: self.shared.objects_destroyed.load(Ordering::Relaxed),
        }
    }

    /// Iterate over the values the body yields.
    pub fn iter(&self) -> GeneratorIter<'_> {
        GeneratorIter::new(self)
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("id", &self.shared.id)
            .field("header", &self.shared.header)
            .field("refs", &self.ref_count())
            .finish()
    }
}

impl<'a> IntoIterator for &'a Generator {
    type Item = Result<Value, GeneratorError>;
    type IntoIter = GeneratorIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Create a generator, or None if the engine refuses one.
///
/// The reason for a refusal is logged; use [`Generator::new`] to get it.
pub fn create_generator(
    engine: &Engine,
    procedure: Arc<Procedure>,
    argument: impl Into<Value>,
) -> Option<Generator> {
    match Generator::new(engine, procedure, argument) {
        Ok(generator) => Some(generator),
        Err(err) => {
            tracing::debug!(error = %err, "generator construction refused");
            None
        }
    }
}
