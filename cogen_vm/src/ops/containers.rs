//! Dictionary access opcode semantics.

use crate::error::{RuntimeError, VmResult};
use cogen_core::Value;

/// container[key]
pub fn get_item(container: &Value, key: &Value) -> VmResult<Value> {
    let dict = container.expect_dict()?;
    let key = key.as_str().ok_or_else(|| {
        RuntimeError::type_error(format!("dict keys must be str, not {}", key.type_name()))
    })?;
    Ok(dict.require(key)?)
}

/// container[key] = value
pub fn set_item(container: &Value, key: &Value, value: Value) -> VmResult<()> {
    let dict = container.expect_dict()?;
    let key = key.as_str().ok_or_else(|| {
        RuntimeError::type_error(format!("dict keys must be str, not {}", key.type_name()))
    })?;
    dict.set(key, value);
    Ok(())
}
