//! Value exchange across the suspension boundary.
//!
//! Each generator owns one [`ExchangeSlots`]: the outbound holder that
//! `yield` fills and the caller snapshots, and the inbound holder that the
//! caller fills before a step and the body reads after its `yield` returns.
//! The owning context carries a [`YieldLink`] to these slots; that link is
//! the only thing that makes `yield` legal.

use super::object::GeneratorId;
use crate::error::{RuntimeError, VmResult};
use crate::native::NativeCall;
use crate::Engine;
use cogen_core::{Value, ValueHolder};
use parking_lot::Mutex;
use std::sync::Arc;

/// The pair of holders a generator exchanges values through.
#[derive(Debug, Default)]
pub struct ExchangeSlots {
    outbound: ValueHolder,
    inbound: Mutex<ValueHolder>,
}

impl ExchangeSlots {
    /// Create empty slots.
    pub fn new() -> Self {
        Self::default()
    }

    /// The live outbound holder.
    #[inline]
    pub fn outbound(&self) -> &ValueHolder {
        &self.outbound
    }

    /// The holder the next step delivers into.
    #[inline]
    pub fn inbound(&self) -> ValueHolder {
        self.inbound.lock().clone()
    }

    /// Caller side, before a step: store `value`, or clear the holder.
    pub fn deliver(&self, value: Option<Value>) {
        let inbound = self.inbound.lock();
        match value {
            Some(value) => inbound.store(value),
            None => inbound.clear(),
        }
    }

    /// Body side, at a yield: publish `value` (or nothing) and hand back a
    /// fresh holder for the next inbound value.
    pub fn publish(&self, value: Option<Value>) -> ValueHolder {
        match value {
            Some(value) => self.outbound.store(value),
            None => self.outbound.clear(),
        }
        let reply = ValueHolder::new();
        *self.inbound.lock() = reply.clone();
        reply
    }
}

/// Capability stored in a generator-owned context.
#[derive(Debug, Clone)]
pub struct YieldLink {
    generator: GeneratorId,
    slots: Arc<ExchangeSlots>,
}

impl YieldLink {
    /// Link a context to `generator`'s slots.
    pub fn new(generator: GeneratorId, slots: Arc<ExchangeSlots>) -> Self {
        Self { generator, slots }
    }

    /// Owning generator.
    #[inline]
    pub fn generator(&self) -> GeneratorId {
        self.generator
    }

    /// Exchange slots of the owning generator.
    #[inline]
    pub fn slots(&self) -> &ExchangeSlots {
        &self.slots
    }
}

/// The `yield` native.
///
/// `yield()` or `yield(value)`. Faults with an invalid suspension unless the
/// calling context belongs to a generator; otherwise publishes the value,
/// suspends the context, and returns the holder for the next inbound value.
pub fn native_yield(call: &mut NativeCall<'_>) -> VmResult<Value> {
    let link = call.link().ok_or_else(RuntimeError::invalid_suspension)?;
    call.expect_argc(0, 1)?;

    let reply = link.slots().publish(call.arg(0).cloned());
    call.heap().track_holder(&reply);
    call.suspend();

    tracing::trace!(generator = %link.generator(), context = %call.context(), "yield");
    Ok(Value::Any(reply))
}

/// Install generator support (`yield`) into `engine`. Idempotent.
pub fn register_generator_support(engine: &Engine) {
    engine.register_native("yield", native_yield);
}
