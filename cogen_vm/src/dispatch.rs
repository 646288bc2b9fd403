//! Main execution loop.
//!
//! `execute` runs a context until its entry procedure returns, a native asks
//! for suspension, or a fault is raised. Suspension needs no stack switching:
//! the loop simply returns with every frame's instruction pointer saved, and
//! the next `execute` continues from there.

use crate::bytecode::{Instruction, Opcode, Procedure, Register};
use crate::config::EngineConfig;
use crate::context::{Context, ContextState};
use crate::error::{RuntimeError, TracebackEntry, VmResult};
use crate::frame::Frame;
use crate::heap::Heap;
use crate::native::{NativeCall, NativeRegistry};
use crate::ops::{arithmetic, comparison, containers};
use cogen_core::{Dictionary, Value};
use smallvec::SmallVec;
use std::sync::Arc;

/// Result of one `execute` call.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// A native requested suspension; executing again resumes.
    Suspended,
    /// The entry procedure returned this value.
    Completed(Value),
    /// The procedure raised a fault or was aborted.
    Faulted(RuntimeError),
}

impl ExecutionOutcome {
    /// Returns true for `Suspended`.
    #[inline]
    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended)
    }
}

/// Control flow result from one instruction.
#[derive(Debug)]
pub(crate) enum ControlFlow {
    /// Continue to next instruction.
    Continue,
    /// Absolute jump.
    Jump(u16),
    /// Push a frame for a procedure call.
    Call {
        procedure: Arc<Procedure>,
        return_reg: u8,
        args: SmallVec<[Value; 4]>,
    },
    /// Return value and pop frame.
    Return(Value),
    /// Stop and leave the context resumable.
    Suspend,
}

/// Engine services the loop needs.
pub(crate) struct Runtime<'a> {
    pub config: &'a EngineConfig,
    pub natives: &'a NativeRegistry,
    pub heap: &'a Heap,
}

enum Exit {
    Suspended,
    Returned(Value),
}

/// Run `ctx` until it suspends, returns, or faults.
pub(crate) fn execute(ctx: &mut Context, rt: &Runtime<'_>) -> ExecutionOutcome {
    if !ctx.state.is_runnable() {
        return ExecutionOutcome::Faulted(RuntimeError::invalid_state(
            "execute",
            ctx.state.name(),
        ));
    }

    ctx.state = ContextState::Active;
    ctx.suspend_requested = false;

    match run_loop(ctx, rt) {
        Ok(Exit::Suspended) => {
            ctx.state = ContextState::Suspended;
            ExecutionOutcome::Suspended
        }
        Ok(Exit::Returned(value)) => {
            ctx.frames.clear();
            ctx.result = value.clone();
            ctx.state = ContextState::Finished;
            ExecutionOutcome::Completed(value)
        }
        Err(mut err) => {
            for frame in ctx.frames.iter().rev() {
                err.add_traceback(TracebackEntry {
                    procedure: frame.procedure.name.clone(),
                    ip: frame.ip.saturating_sub(1),
                });
            }
            ctx.frames.clear();
            ctx.state = ContextState::Faulted;
            ExecutionOutcome::Faulted(err)
        }
    }
}

#[inline(never)]
fn run_loop(ctx: &mut Context, rt: &Runtime<'_>) -> VmResult<Exit> {
    let mut executed: u64 = 0;

    loop {
        if let Some(budget) = rt.config.instruction_budget {
            if executed >= budget {
                return Err(RuntimeError::execution_limit(budget));
            }
        }

        let frame = ctx
            .frames
            .last_mut()
            .ok_or_else(|| RuntimeError::internal("context has no frame"))?;

        // Implicit return None at the end of a procedure.
        let Some(inst) = frame.fetch() else {
            match pop_frame(ctx, Value::None) {
                Some(value) => return Ok(Exit::Returned(value)),
                None => continue,
            }
        };

        executed += 1;
        ctx.executed += 1;

        match step(ctx, rt, inst)? {
            ControlFlow::Continue => {}
            ControlFlow::Jump(target) => {
                if let Some(frame) = ctx.frames.last_mut() {
                    frame.ip = u32::from(target);
                }
            }
            ControlFlow::Call {
                procedure,
                return_reg,
                args,
            } => push_frame(ctx, rt.config, procedure, return_reg, &args)?,
            ControlFlow::Return(value) => {
                if let Some(result) = pop_frame(ctx, value) {
                    return Ok(Exit::Returned(result));
                }
            }
            ControlFlow::Suspend => return Ok(Exit::Suspended),
        }
    }
}

fn push_frame(
    ctx: &mut Context,
    config: &EngineConfig,
    procedure: Arc<Procedure>,
    return_reg: u8,
    args: &[Value],
) -> VmResult<()> {
    if ctx.frames.len() >= config.max_call_depth {
        return Err(RuntimeError::recursion_error(config.max_call_depth));
    }
    if args.len() != usize::from(procedure.arity) {
        return Err(RuntimeError::arity_mismatch(
            procedure.name.clone(),
            procedure.arity,
            args.len(),
        ));
    }

    let mut frame = Frame::new(procedure, Some(return_reg));
    frame.registers[..args.len()].clone_from_slice(args);
    ctx.frames.push(frame);
    Ok(())
}

/// Pop the current frame. Returns the value when the entry frame returns.
fn pop_frame(ctx: &mut Context, value: Value) -> Option<Value> {
    let frame = ctx.frames.pop()?;
    match (frame.return_reg, ctx.frames.last_mut()) {
        (Some(reg), Some(caller)) => {
            caller.set_reg(Register(reg), value);
            None
        }
        _ => Some(value),
    }
}

/// Execute one instruction against the top frame.
fn step(ctx: &mut Context, rt: &Runtime<'_>, inst: Instruction) -> VmResult<ControlFlow> {
    let op = Opcode::from_u8(inst.opcode())
        .ok_or_else(|| RuntimeError::invalid_opcode(inst.opcode()))?;

    let Context {
        id,
        frames,
        link,
        suspend_requested,
        ..
    } = ctx;
    let frame = frames
        .last_mut()
        .ok_or_else(|| RuntimeError::internal("context has no frame"))?;
    let (dst, src1, src2) = (inst.dst(), inst.src1(), inst.src2());

    let flow = match op {
        // =====================================================================
        // Control Flow
        // =====================================================================
        Opcode::Nop => ControlFlow::Continue,
        Opcode::Return => ControlFlow::Return(frame.get_reg(dst)),
        Opcode::ReturnNone => ControlFlow::Return(Value::None),
        Opcode::Jump => ControlFlow::Jump(inst.imm16()),
        Opcode::JumpIfFalse => {
            if frame.get_reg(dst).is_truthy() {
                ControlFlow::Continue
            } else {
                ControlFlow::Jump(inst.imm16())
            }
        }
        Opcode::Raise => {
            return Err(RuntimeError::exception(frame.get_reg(dst).to_string()));
        }

        // =====================================================================
        // Load/Store
        // =====================================================================
        Opcode::LoadConst => {
            let value = frame
                .get_const(inst.imm16())
                .cloned()
                .ok_or_else(|| RuntimeError::internal("constant index out of range"))?;
            frame.set_reg(dst, value);
            ControlFlow::Continue
        }
        Opcode::LoadNone => {
            frame.set_reg(dst, Value::None);
            ControlFlow::Continue
        }
        Opcode::Move => {
            frame.set_reg(dst, frame.get_reg(src1));
            ControlFlow::Continue
        }

        // =====================================================================
        // Arithmetic & Comparison
        // =====================================================================
        Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Lt | Opcode::Eq => {
            let a = frame.get_reg(src1);
            let b = frame.get_reg(src2);
            let value = match op {
                Opcode::Add => arithmetic::add(&a, &b)?,
                Opcode::Sub => arithmetic::sub(&a, &b)?,
                Opcode::Mul => arithmetic::mul(&a, &b)?,
                Opcode::Lt => comparison::lt(&a, &b)?,
                _ => comparison::eq(&a, &b),
            };
            frame.set_reg(dst, value);
            ControlFlow::Continue
        }

        // =====================================================================
        // Containers
        // =====================================================================
        Opcode::NewDict => {
            let dict = Dictionary::new();
            rt.heap.track_dict(&dict);
            frame.set_reg(dst, Value::Dict(dict));
            ControlFlow::Continue
        }
        Opcode::GetItem => {
            let value = containers::get_item(&frame.get_reg(src1), &frame.get_reg(src2))?;
            frame.set_reg(dst, value);
            ControlFlow::Continue
        }
        Opcode::SetItem => {
            containers::set_item(&frame.get_reg(dst), &frame.get_reg(src1), frame.get_reg(src2))?;
            ControlFlow::Continue
        }

        // =====================================================================
        // Calls
        // =====================================================================
        Opcode::Call => {
            let procedure = frame
                .procedure
                .procedures
                .get(src1.index() as usize)
                .cloned()
                .ok_or_else(|| RuntimeError::internal("procedure index out of range"))?;
            ControlFlow::Call {
                procedure,
                return_reg: dst.index(),
                args: frame.window(dst.offset(1), src2.index()),
            }
        }
        Opcode::CallNative => {
            let name = frame
                .procedure
                .names
                .get(src1.index() as usize)
                .cloned()
                .ok_or_else(|| RuntimeError::internal("name index out of range"))?;
            let function = rt
                .natives
                .get(&name)
                .ok_or_else(|| RuntimeError::name_error(name.clone()))?;
            let args = frame.window(dst.offset(1), src2.index());

            tracing::trace!(native = %name, context = %id, argc = args.len(), "native call");
            let mut call = NativeCall::new(
                &name,
                &args,
                link.as_ref(),
                suspend_requested,
                rt.heap,
                *id,
            );
            let value = function(&mut call)?;
            frame.set_reg(dst, value);

            if *suspend_requested {
                ControlFlow::Suspend
            } else {
                ControlFlow::Continue
            }
        }
    };

    Ok(flow)
}
