//! Native functions callable from bytecode.
//!
//! A native receives a [`NativeCall`]: the arguments plus the parts of the
//! calling context it may legitimately touch. There is no global "active
//! context"; whatever a native can observe about its caller arrives through
//! this handle.

use crate::context::ContextId;
use crate::error::{RuntimeError, VmResult};
use crate::generators::YieldLink;
use crate::heap::Heap;
use cogen_core::Value;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Native function signature.
pub type NativeFn = fn(&mut NativeCall<'_>) -> VmResult<Value>;

/// Call handle passed to a native function.
pub struct NativeCall<'a> {
    name: &'a str,
    args: &'a [Value],
    link: Option<&'a YieldLink>,
    suspend: &'a mut bool,
    heap: &'a Heap,
    context: ContextId,
}

impl<'a> NativeCall<'a> {
    pub(crate) fn new(
        name: &'a str,
        args: &'a [Value],
        link: Option<&'a YieldLink>,
        suspend: &'a mut bool,
        heap: &'a Heap,
        context: ContextId,
    ) -> Self {
        Self {
            name,
            args,
            link,
            suspend,
            heap,
            context,
        }
    }

    /// Name the native was called by.
    #[inline]
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// All arguments.
    #[inline]
    pub fn args(&self) -> &'a [Value] {
        self.args
    }

    /// Number of arguments.
    #[inline]
    pub fn argc(&self) -> usize {
        self.args.len()
    }

    /// Argument `index`, or None past the end.
    #[inline]
    pub fn arg(&self, index: usize) -> Option<&'a Value> {
        self.args.get(index)
    }

    /// Fail with a TypeError unless `min <= argc <= max`.
    pub fn expect_argc(&self, min: usize, max: usize) -> VmResult<()> {
        let given = self.args.len();
        if given < min || given > max {
            let expected = if min == max {
                format!("exactly {}", min)
            } else {
                format!("{} to {}", min, max)
            };
            return Err(RuntimeError::type_error(format!(
                "{}() takes {} argument(s) ({} given)",
                self.name, expected, given
            )));
        }
        Ok(())
    }

    /// The generator link of the calling context, if a generator owns it.
    #[inline]
    pub fn link(&self) -> Option<&'a YieldLink> {
        self.link
    }

    /// Heap of the engine running the call.
    #[inline]
    pub fn heap(&self) -> &'a Heap {
        self.heap
    }

    /// Calling context.
    #[inline]
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Ask the engine to suspend the calling context once this native returns.
    #[inline]
    pub fn suspend(&mut self) {
        *self.suspend = true;
    }
}

/// Registry of native functions by name.
#[derive(Default)]
pub struct NativeRegistry {
    functions: RwLock<FxHashMap<Arc<str>, NativeFn>>,
}

impl NativeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `function` under `name`, returning the previous binding.
    pub fn register(&self, name: &str, function: NativeFn) -> Option<NativeFn> {
        self.functions.write().insert(Arc::from(name), function)
    }

    /// Look up a native by name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<NativeFn> {
        self.functions.read().get(name).copied()
    }

    /// Returns true if `name` is registered.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.functions.read().contains_key(name)
    }

    /// Number of registered natives.
    pub fn len(&self) -> usize {
        self.functions.read().len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.functions.read().is_empty()
    }
}

impl std::fmt::Debug for NativeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.functions.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("NativeRegistry")
            .field("functions", &names)
            .finish()
    }
}
