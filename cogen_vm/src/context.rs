//! Suspendable execution contexts.
//!
//! A context is the unit the engine executes: a frame stack plus the state
//! needed to stop in the middle of a procedure and pick up again later.
//! Contexts come from the engine's pool and go back to it when released.

use crate::bytecode::{Procedure, Register};
use crate::error::{RuntimeError, VmResult};
use crate::frame::Frame;
use crate::generators::YieldLink;
use cogen_core::Value;
use std::fmt;
use std::sync::Arc;

/// Identifier assigned to a context by the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// Execution state of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContextState {
    /// In the pool or freshly acquired; nothing to run.
    #[default]
    Idle,
    /// A procedure and its arguments are bound; ready to execute.
    Prepared,
    /// Currently inside `Engine::execute`.
    Active,
    /// Stopped at a suspension point; executing again resumes it.
    Suspended,
    /// The procedure returned.
    Finished,
    /// The procedure raised a fault or was aborted.
    Faulted,
}

impl ContextState {
    /// Lowercase state name used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Prepared => "prepared",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Finished => "finished",
            Self::Faulted => "faulted",
        }
    }

    /// Returns true if `execute` may run this context.
    #[inline]
    pub const fn is_runnable(self) -> bool {
        matches!(self, Self::Prepared | Self::Suspended)
    }

    /// Returns true once the procedure can no longer run.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Faulted)
    }
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A suspendable execution context.
pub struct Context {
    pub(crate) id: ContextId,
    pub(crate) state: ContextState,
    pub(crate) frames: Vec<Frame>,
    pub(crate) link: Option<YieldLink>,
    pub(crate) suspend_requested: bool,
    pub(crate) executed: u64,
    pub(crate) result: Value,
}

impl Context {
    pub(crate) fn new(id: ContextId) -> Self {
        Self {
            id,
            state: ContextState::Idle,
            frames: Vec::new(),
            link: None,
            suspend_requested: false,
            executed: 0,
            result: Value::None,
        }
    }

    /// Pool-assigned identifier.
    #[inline]
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Number of frames on the stack.
    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Instructions executed since the context was last prepared.
    #[inline]
    pub fn instructions_executed(&self) -> u64 {
        self.executed
    }

    /// Return value of a finished procedure.
    #[inline]
    pub fn result(&self) -> &Value {
        &self.result
    }

    /// Bind `procedure` and its arguments, ready for the first `execute`.
    ///
    /// Arguments land in `r0..arity`. Fails if the argument count does not
    /// match the procedure's arity, or if the context is mid-execution.
    pub fn prepare(&mut self, procedure: Arc<Procedure>, args: &[Value]) -> VmResult<()> {
        if matches!(self.state, ContextState::Active | ContextState::Suspended) {
            return Err(RuntimeError::invalid_state("prepare", self.state.name()));
        }
        if args.len() != usize::from(procedure.arity) {
            return Err(RuntimeError::arity_mismatch(
                procedure.name.clone(),
                procedure.arity,
                args.len(),
            ));
        }

        let mut frame = Frame::new(procedure, None);
        for (i, arg) in args.iter().enumerate() {
            frame.set_reg(Register(i as u8), arg.clone());
        }

        self.frames.clear();
        self.frames.push(frame);
        self.suspend_requested = false;
        self.executed = 0;
        self.result = Value::None;
        self.state = ContextState::Prepared;
        Ok(())
    }

    // =========================================================================
    // Generator Link
    // =========================================================================

    /// Mark this context as owned by a generator.
    #[inline]
    pub fn set_link(&mut self, link: YieldLink) {
        self.link = Some(link);
    }

    /// Remove the generator link, returning it.
    #[inline]
    pub fn clear_link(&mut self) -> Option<YieldLink> {
        self.link.take()
    }

    /// The generator link, if any.
    #[inline]
    pub fn link(&self) -> Option<&YieldLink> {
        self.link.as_ref()
    }

    /// Returns true if a generator owns this context.
    #[inline]
    pub fn is_generator_owned(&self) -> bool {
        self.link.is_some()
    }

    /// Return to the idle state, dropping frames, link, and result.
    pub(crate) fn reset(&mut self) {
        self.frames.clear();
        self.link = None;
        self.suspend_requested = false;
        self.executed = 0;
        self.result = Value::None;
        self.state = ContextState::Idle;
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("depth", &self.frames.len())
            .field("generator_owned", &self.is_generator_owned())
            .finish()
    }
}
