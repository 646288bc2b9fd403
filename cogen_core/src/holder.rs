//! Type-erased, reference-counted value container.
//!
//! A `ValueHolder` is the unit of exchange across a suspension boundary. The
//! holder itself is shared (cloning a holder clones the handle, not the
//! content), so a producer can hand a holder out now and fill it in later,
//! and a consumer can keep an old holder alive while the producer moves on
//! to a new one.
//!
//! Retrieval converts between the two numeric payloads, matching what
//! running code expects from an `any` container: storing an int and reading a
//! float gives the widened value, and the reverse truncates toward zero.

use crate::value::{TypeTag, Value};
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

/// Shared container for one [`Value`] of any type.
#[derive(Clone, Default)]
pub struct ValueHolder {
    slot: Arc<RwLock<Value>>,
}

impl ValueHolder {
    /// Creates an empty holder.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a holder that already contains `value`.
    #[inline]
    pub fn with_value(value: impl Into<Value>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(value.into())),
        }
    }

    /// Replaces the content.
    #[inline]
    pub fn store(&self, value: impl Into<Value>) {
        *self.slot.write() = value.into();
    }

    /// Returns a clone of the content.
    #[inline]
    pub fn retrieve(&self) -> Value {
        self.slot.read().clone()
    }

    /// Reads the content as an integer, truncating floats.
    pub fn retrieve_int(&self) -> Option<i64> {
        match &*self.slot.read() {
            Value::Int(i) => Some(*i),
            Value::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    /// Reads the content as a float, widening integers.
    pub fn retrieve_float(&self) -> Option<f64> {
        self.slot.read().to_f64()
    }

    /// Takes the content out, leaving the holder empty.
    #[inline]
    pub fn take(&self) -> Value {
        std::mem::take(&mut *self.slot.write())
    }

    /// Empties the holder.
    #[inline]
    pub fn clear(&self) {
        self.store(Value::None);
    }

    /// Tag of the current content.
    #[inline]
    pub fn type_tag(&self) -> TypeTag {
        self.slot.read().type_tag()
    }

    /// Returns true if the holder contains no value.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slot.read().is_none()
    }

    /// New, independent holder with a copy of the current content.
    ///
    /// Later stores into either holder are not visible through the other.
    #[inline]
    pub fn snapshot(&self) -> Self {
        Self::with_value(self.retrieve())
    }

    /// Returns true if both handles refer to the same container.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    /// Number of live handles to this container.
    #[inline]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.slot)
    }

    /// Weak, type-erased handle used for allocation accounting.
    pub fn downgrade(&self) -> Weak<dyn Any + Send + Sync> {
        let weak: Weak<RwLock<Value>> = Arc::downgrade(&self.slot);
        weak
    }
}

impl fmt::Debug for ValueHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot.try_read() {
            Some(value) => f.debug_tuple("ValueHolder").field(&*value).finish(),
            None => f.write_str("ValueHolder(<locked>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ObjectRef;

    #[test]
    fn test_new_holder_is_empty() {
        let holder = ValueHolder::new();
        assert!(holder.is_empty());
        assert_eq!(holder.type_tag(), TypeTag::None);
        assert_eq!(holder.retrieve(), Value::None);
    }

    #[test]
    fn test_store_and_retrieve() {
        let holder = ValueHolder::new();
        holder.store(42_i64);
        assert_eq!(holder.retrieve(), Value::Int(42));
        assert_eq!(holder.type_tag(), TypeTag::Int);
        holder.store("text");
        assert_eq!(holder.retrieve(), Value::from("text"));
    }

    #[test]
    fn test_numeric_conversion() {
        let holder = ValueHolder::with_value(7_i64);
        assert_eq!(holder.retrieve_float(), Some(7.0));
        holder.store(2.9);
        assert_eq!(holder.retrieve_int(), Some(2));
        holder.store(-2.9);
        assert_eq!(holder.retrieve_int(), Some(-2));
        holder.store("nope");
        assert_eq!(holder.retrieve_int(), None);
        assert_eq!(holder.retrieve_float(), None);
    }

    #[test]
    fn test_clones_share_content() {
        let a = ValueHolder::new();
        let b = a.clone();
        b.store(1_i64);
        assert_eq!(a.retrieve(), Value::Int(1));
        assert!(a.ptr_eq(&b));
        assert_eq!(a.ref_count(), 2);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let live = ValueHolder::with_value(1_i64);
        let snap = live.snapshot();
        live.store(2_i64);
        assert_eq!(snap.retrieve(), Value::Int(1));
        assert!(!snap.ptr_eq(&live));
    }

    #[test]
    fn test_take_and_clear() {
        let holder = ValueHolder::with_value(true);
        assert_eq!(holder.take(), Value::Bool(true));
        assert!(holder.is_empty());
        holder.store(3_i64);
        holder.clear();
        assert!(holder.is_empty());
    }

    #[test]
    fn test_structured_payload_survives_holder() {
        let holder = ValueHolder::with_value(ObjectRef::new(vec![1_u8, 2, 3]));
        let value = holder.retrieve();
        let bytes = value
            .as_object()
            .and_then(|o| o.downcast_ref::<Vec<u8>>())
            .cloned();
        assert_eq!(bytes, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_holder_outlives_producer_handle() {
        let produced = {
            let holder = ValueHolder::with_value(5_i64);
            holder.clone()
        };
        assert_eq!(produced.retrieve(), Value::Int(5));
        assert_eq!(produced.ref_count(), 1);
    }

    #[test]
    fn test_downgrade_tracks_lifetime() {
        let holder = ValueHolder::new();
        let weak = holder.downgrade();
        assert!(weak.upgrade().is_some());
        drop(holder);
        assert!(weak.upgrade().is_none());
    }
}
