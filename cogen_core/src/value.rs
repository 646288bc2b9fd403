//! Tagged value representation shared by the host and the generator protocol.
//!
//! A `Value` is a tagged union over the payload kinds the host understands
//! natively (none, bool, int, float, str, dict) plus two reference kinds:
//! a [`ValueHolder`] and an arbitrary host object. Values cross suspension
//! boundaries by clone; reference kinds share their payload through `Arc`,
//! so a value handed to a caller stays alive however long the caller keeps it.
//!
//! | Tag      | Payload                          | Clone cost        |
//! |----------|----------------------------------|-------------------|
//! | `none`   | -                                | copy              |
//! | `bool`   | `bool`                           | copy              |
//! | `int`    | `i64`                            | copy              |
//! | `float`  | `f64`                            | copy              |
//! | `str`    | `Arc<str>`                       | refcount bump     |
//! | `dict`   | [`Dictionary`]                   | refcount bump     |
//! | `any`    | [`ValueHolder`]                  | refcount bump     |
//! | `object` | [`ObjectRef`]                    | refcount bump     |

use crate::dict::Dictionary;
use crate::error::{CoreError, CoreResult};
use crate::holder::ValueHolder;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Type Tags
// =============================================================================

/// Discriminant of a [`Value`], used for diagnostics and typed retrieval.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// The empty value.
    None = 0,
    /// Boolean.
    Bool = 1,
    /// Signed 64-bit integer.
    Int = 2,
    /// Double-precision float.
    Float = 3,
    /// Immutable string.
    Str = 4,
    /// Shared dictionary.
    Dict = 5,
    /// Value holder (type-erased container).
    Any = 6,
    /// Arbitrary host object.
    Object = 7,
}

impl TypeTag {
    /// Returns the name running code sees for this type.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Dict => "dict",
            Self::Any => "any",
            Self::Object => "object",
        }
    }

    /// Returns true for the two numeric tags.
    #[inline]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Object References
// =============================================================================

/// Shared reference to an arbitrary host object.
///
/// This is the escape hatch for structured payloads the host has no native
/// tag for. The object is immutable once wrapped; callers recover it with
/// [`ObjectRef::downcast_ref`].
#[derive(Clone)]
pub struct ObjectRef {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl ObjectRef {
    /// Wraps `value` in a new shared object.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    /// Wraps an already shared object.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: value,
        }
    }

    /// Rust type name of the wrapped object.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrows the object as `T`, if that is what it holds.
    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Returns true if both references point at the same object.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live references to the object.
    #[inline]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<object {}>", self.type_name)
    }
}

// =============================================================================
// Value
// =============================================================================

/// A host value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// The empty value.
    #[default]
    None,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Immutable string.
    Str(Arc<str>),
    /// Shared, mutable dictionary.
    Dict(Dictionary),
    /// Type-erased holder whose content may change after the value is handed out.
    Any(ValueHolder),
    /// Arbitrary host object.
    Object(ObjectRef),
}

impl Value {
    /// Returns the tag for this value.
    #[inline]
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::None => TypeTag::None,
            Self::Bool(_) => TypeTag::Bool,
            Self::Int(_) => TypeTag::Int,
            Self::Float(_) => TypeTag::Float,
            Self::Str(_) => TypeTag::Str,
            Self::Dict(_) => TypeTag::Dict,
            Self::Any(_) => TypeTag::Any,
            Self::Object(_) => TypeTag::Object,
        }
    }

    /// Returns the type name running code sees.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_tag().name()
    }

    /// Returns true if this is the empty value.
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Truthiness used by conditional jumps.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::Dict(d) => !d.is_empty(),
            Self::Any(h) => !h.is_empty(),
            Self::Object(_) => true,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the boolean payload.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer payload.
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float payload.
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string payload.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the dictionary payload.
    #[inline]
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Self::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Returns the holder payload.
    #[inline]
    pub fn as_holder(&self) -> Option<&ValueHolder> {
        match self {
            Self::Any(h) => Some(h),
            _ => None,
        }
    }

    /// Returns the object payload.
    #[inline]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Reads the integer payload or reports the mismatch.
    pub fn expect_int(&self) -> CoreResult<i64> {
        self.as_int()
            .ok_or_else(|| CoreError::type_mismatch(TypeTag::Int, self.type_tag()))
    }

    /// Reads the dictionary payload or reports the mismatch.
    pub fn expect_dict(&self) -> CoreResult<&Dictionary> {
        self.as_dict()
            .ok_or_else(|| CoreError::type_mismatch(TypeTag::Dict, self.type_tag()))
    }

    /// Reads a number as `f64`, widening integers.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Identity comparison for reference kinds, value comparison otherwise.
    ///
    /// Integers and floats never compare equal to each other here; use
    /// numeric promotion in the interpreter for mixed comparisons.
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Dict(a), Self::Dict(b)) => a.ptr_eq(b),
            (Self::Any(a), Self::Any(b)) => a.ptr_eq(b),
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Str(s) => f.write_str(s),
            Self::Dict(d) => write!(f, "<dict of {}>", d.len()),
            Self::Any(h) => write!(f, "<any {}>", h.type_tag()),
            Self::Object(o) => write!(f, "<object {}>", o.type_name()),
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<()> for Value {
    #[inline]
    fn from((): ()) -> Self {
        Self::None
    }
}

impl From<bool> for Value {
    #[inline]
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    #[inline]
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    #[inline]
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(s: &str) -> Self {
        Self::Str(s.into())
    }
}

impl From<String> for Value {
    #[inline]
    fn from(s: String) -> Self {
        Self::Str(s.into())
    }
}

impl From<Arc<str>> for Value {
    #[inline]
    fn from(s: Arc<str>) -> Self {
        Self::Str(s)
    }
}

impl From<Dictionary> for Value {
    #[inline]
    fn from(d: Dictionary) -> Self {
        Self::Dict(d)
    }
}

impl From<ValueHolder> for Value {
    #[inline]
    fn from(h: ValueHolder) -> Self {
        Self::Any(h)
    }
}

impl From<ObjectRef> for Value {
    #[inline]
    fn from(o: ObjectRef) -> Self {
        Self::Object(o)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    #[inline]
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::None, Into::into)
    }
}
