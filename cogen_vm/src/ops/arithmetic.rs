//! Arithmetic opcode semantics.
//!
//! Integer arithmetic wraps on overflow. Mixing an int with a float promotes
//! to float. `+` also concatenates strings.

use crate::error::{RuntimeError, VmResult};
use cogen_core::Value;
use std::sync::Arc;

/// Promote a numeric pair to floats, or fail with the operator's TypeError.
#[inline]
fn float_pair(op: &'static str, a: &Value, b: &Value) -> VmResult<(f64, f64)> {
    match (a.to_f64(), b.to_f64()) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(RuntimeError::unsupported_operand(
            op,
            a.type_name(),
            b.type_name(),
        )),
    }
}

/// a + b
pub fn add(a: &Value, b: &Value) -> VmResult<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_add(*y))),
        (Value::Str(x), Value::Str(y)) => {
            let mut s = String::with_capacity(x.len() + y.len());
            s.push_str(x);
            s.push_str(y);
            Ok(Value::Str(Arc::from(s)))
        }
        _ => float_pair("+", a, b).map(|(x, y)| Value::Float(x + y)),
    }
}

/// a - b
pub fn sub(a: &Value, b: &Value) -> VmResult<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_sub(*y))),
        _ => float_pair("-", a, b).map(|(x, y)| Value::Float(x - y)),
    }
}

/// a * b
pub fn mul(a: &Value, b: &Value) -> VmResult<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_mul(*y))),
        _ => float_pair("*", a, b).map(|(x, y)| Value::Float(x * y)),
    }
}
