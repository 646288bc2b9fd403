//! Builtin native functions.

mod functions;

pub use functions::{builtin_len, builtin_retrieve, builtin_type_name};

use crate::Engine;

/// Register every builtin with `engine`.
pub fn register_builtins(engine: &Engine) {
    engine.register_native("retrieve", builtin_retrieve);
    engine.register_native("type_name", builtin_type_name);
    engine.register_native("len", builtin_len);
}
