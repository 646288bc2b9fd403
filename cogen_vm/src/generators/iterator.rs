//! Caller-facing generator errors and the iterator adapter.

use super::object::Generator;
use crate::error::RuntimeError;
use cogen_core::Value;
use thiserror::Error;

/// Errors that can occur while creating or stepping a generator.
#[derive(Error, Debug, Clone)]
pub enum GeneratorError {
    /// No generator was created: the pool is exhausted or the procedure
    /// rejected its argument.
    #[error("cannot create generator: {0}")]
    Construction(RuntimeError),
    /// The generator is already being stepped.
    #[error("generator already executing")]
    AlreadyRunning,
    /// The body faulted; the generator is now completed.
    #[error("generator body faulted: {0}")]
    Fault(RuntimeError),
}

impl GeneratorError {
    /// The underlying host error, if any.
    pub fn runtime_error(&self) -> Option<&RuntimeError> {
        match self {
            Self::Construction(err) | Self::Fault(err) => Some(err),
            Self::AlreadyRunning => None,
        }
    }
}

/// Iterator over the values a generator yields.
///
/// Each `next` steps the generator once. A fault is reported once, after
/// which the iterator is exhausted.
pub struct GeneratorIter<'a> {
    generator: &'a Generator,
    done: bool,
}

impl<'a> GeneratorIter<'a> {
    pub(crate) fn new(generator: &'a Generator) -> Self {
        Self {
            generator,
            done: false,
        }
    }
}

impl Iterator for GeneratorIter<'_> {
    type Item = Result<Value, GeneratorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.generator.step() {
            Ok(true) => Some(Ok(self.generator.value().retrieve())),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl std::iter::FusedIterator for GeneratorIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::ProcedureBuilder;
    use crate::Engine;

    /// for i in 0..n { yield(i) }
    fn count_to() -> std::sync::Arc<crate::bytecode::Procedure> {
        let mut b = ProcedureBuilder::new("count_to", 1);
        let n = b.param(0);
        let (i, one, cond, reply) = (
            b.alloc_register(),
            b.alloc_register(),
            b.alloc_register(),
            b.alloc_register(),
        );
        let top = b.new_label();
        let done = b.new_label();
        b.emit_load_int(i, 0);
        b.emit_load_int(one, 1);
        b.bind_label(top);
        b.emit_lt(cond, i, n);
        b.emit_jump_if_false(cond, done);
        b.emit_yield(reply, Some(i));
        b.emit_add(i, i, one);
        b.emit_jump(top);
        b.bind_label(done);
        b.emit_return_none();
        b.finish().unwrap()
    }

    #[test]
    fn test_iter_collects_values() {
        let engine = Engine::new();
        let generator = Generator::new(&engine, count_to(), 4_i64).unwrap();
        let values: Vec<i64> = generator
            .iter()
            .map(|v| v.unwrap().as_int().unwrap())
            .collect();
        assert_eq!(values, vec![0, 1, 2, 3]);
        assert!(generator.is_completed());
    }

    #[test]
    fn test_iter_reports_fault_once() {
        let mut b = ProcedureBuilder::new("bad", 1);
        let r = b.alloc_register();
        b.emit_yield(r, Some(b.param(0)));
        b.emit_load_const(r, "bad state");
        b.emit_raise(r);

        let engine = Engine::new();
        let generator = Generator::new(&engine, b.finish().unwrap(), 1_i64).unwrap();
        let mut iter = generator.iter();
        assert_eq!(iter.next().unwrap().unwrap().as_int(), Some(1));
        let err = iter.next().unwrap().unwrap_err();
        assert!(matches!(err, GeneratorError::Fault(_)));
        assert_eq!(err.to_string(), "generator body faulted: Exception: bad state");
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_error_accessors() {
        assert!(GeneratorError::AlreadyRunning.runtime_error().is_none());
        let err = GeneratorError::Construction(RuntimeError::pool_exhausted(1));
        assert!(err.runtime_error().is_some());
        assert!(err.to_string().starts_with("cannot create generator"));
    }
}
