//! Comparison opcode semantics.

use crate::error::{RuntimeError, VmResult};
use cogen_core::Value;

/// a < b for numbers (with int/float promotion) and strings.
pub fn lt(a: &Value, b: &Value) -> VmResult<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Bool(x < y)),
        (Value::Str(x), Value::Str(y)) => Ok(Value::Bool(x < y)),
        _ => match (a.to_f64(), b.to_f64()) {
            (Some(x), Some(y)) => Ok(Value::Bool(x < y)),
            _ => Err(RuntimeError::unsupported_operand(
                "<",
                a.type_name(),
                b.type_name(),
            )),
        },
    }
}

/// a == b. Mixed int/float compare numerically; reference kinds by identity.
pub fn eq(a: &Value, b: &Value) -> Value {
    let equal = match (a, b) {
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
            a.to_f64() == b.to_f64()
        }
        _ => a.same(b),
    };
    Value::Bool(equal)
}
