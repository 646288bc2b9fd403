//! Core builtin functions (retrieve, type_name, len).

use crate::error::{RuntimeError, VmResult};
use crate::native::NativeCall;
use cogen_core::Value;

// =============================================================================
// retrieve
// =============================================================================

/// Builtin retrieve function.
///
/// Returns the value stored in a holder. Any other value is returned as is,
/// so bodies can unwrap a reply without checking what it is.
pub fn builtin_retrieve(call: &mut NativeCall<'_>) -> VmResult<Value> {
    call.expect_argc(1, 1)?;
    Ok(match call.arg(0) {
        Some(Value::Any(holder)) => holder.retrieve(),
        Some(other) => other.clone(),
        None => Value::None,
    })
}

// =============================================================================
// type_name
// =============================================================================

/// Builtin type_name function.
///
/// Returns the type name of its argument, looking through holders.
pub fn builtin_type_name(call: &mut NativeCall<'_>) -> VmResult<Value> {
    call.expect_argc(1, 1)?;
    let name = match call.arg(0) {
        Some(Value::Object(object)) => object.type_name(),
        Some(Value::Any(holder)) => match holder.retrieve() {
            Value::Object(object) => object.type_name(),
            inner => inner.type_name(),
        },
        Some(value) => value.type_name(),
        None => "none",
    };
    Ok(Value::from(name))
}

// =============================================================================
// len
// =============================================================================

/// Builtin len function.
///
/// Returns the number of entries in a dictionary or bytes in a string.
pub fn builtin_len(call: &mut NativeCall<'_>) -> VmResult<Value> {
    call.expect_argc(1, 1)?;
    let len = match call.arg(0) {
        Some(Value::Dict(dict)) => dict.len(),
        Some(Value::Str(s)) => s.len(),
        Some(other) => {
            return Err(RuntimeError::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )));
        }
        None => 0,
    };
    Ok(Value::Int(len as i64))
}
