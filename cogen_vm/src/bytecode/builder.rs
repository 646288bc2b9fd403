//! Procedure builder for bytecode emission.
//!
//! The `ProcedureBuilder` provides a high-level API for constructing bytecode
//! with register allocation, pooled constants and names, and label
//! resolution. Emission errors (pool or register overflow) are recorded and
//! reported once by [`ProcedureBuilder::finish`], so emit calls can be chained
//! without checking each one.

use super::instruction::{Instruction, Opcode, Register};
use super::procedure::Procedure;
use cogen_core::Value;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use thiserror::Error;

/// Maximum registers per procedure.
pub const MAX_REGISTERS: u16 = 256;

/// Errors reported when a procedure cannot be assembled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// More than [`MAX_REGISTERS`] registers were requested.
    #[error("procedure '{procedure}' needs more than {MAX_REGISTERS} registers")]
    TooManyRegisters {
        /// Procedure being built.
        procedure: Arc<str>,
    },
    /// A pool index no longer fits its operand.
    #[error("procedure '{procedure}' overflowed its {pool} pool")]
    PoolOverflow {
        /// Procedure being built.
        procedure: Arc<str>,
        /// Which pool overflowed.
        pool: &'static str,
    },
    /// A call passes more arguments than fit in one operand.
    #[error("procedure '{procedure}' passes {count} arguments in one call")]
    TooManyArguments {
        /// Procedure being built.
        procedure: Arc<str>,
        /// Arguments requested.
        count: usize,
    },
    /// A jump targets a label that was never bound.
    #[error("procedure '{procedure}' jumps to unbound label {label}")]
    UnboundLabel {
        /// Procedure being built.
        procedure: Arc<str>,
        /// Label index.
        label: u32,
    },
    /// The procedure is too long for 16-bit jump targets.
    #[error("procedure '{procedure}' is too long for jump targets")]
    JumpOutOfRange {
        /// Procedure being built.
        procedure: Arc<str>,
    },
}

/// A label for jump targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(u32);

/// A forward reference to a label that needs patching.
#[derive(Debug)]
struct ForwardRef {
    /// Instruction index containing the jump.
    instruction_index: usize,
    /// Jump opcode to re-encode.
    opcode: Opcode,
    /// Tested register (`JumpIfFalse` only).
    register: Register,
    /// The label being jumped to.
    label: Label,
}

/// Builder for constructing procedures.
///
/// # Example
/// ```
/// use cogen_vm::bytecode::ProcedureBuilder;
///
/// // yield(1); yield(2); return
/// let mut b = ProcedureBuilder::new("count", 1);
/// let v = b.alloc_register();
/// let reply = b.alloc_register();
/// b.emit_load_int(v, 1);
/// b.emit_yield(reply, Some(v));
/// b.emit_load_int(v, 2);
/// b.emit_yield(reply, Some(v));
/// b.emit_return_none();
/// let procedure = b.finish().unwrap();
/// assert_eq!(procedure.arity, 1);
/// ```
pub struct ProcedureBuilder {
    /// Procedure name.
    name: Arc<str>,
    /// Parameter count.
    arity: u8,
    /// Next free register.
    next_register: u16,

    /// Emitted instructions.
    instructions: Vec<Instruction>,
    /// Constant pool.
    constants: Vec<Value>,
    /// Native name pool.
    names: Vec<Arc<str>>,
    /// Name to index map.
    name_map: FxHashMap<Arc<str>, u8>,
    /// Callee pool.
    procedures: Vec<Arc<Procedure>>,

    /// Bound label positions.
    labels: Vec<Option<u16>>,
    /// Jumps waiting for their label.
    forward_refs: Vec<ForwardRef>,

    /// First error recorded during emission.
    error: Option<BuildError>,
}

impl ProcedureBuilder {
    /// Create a builder for a procedure taking `arity` parameters.
    ///
    /// Parameters occupy the first `arity` registers; see [`Self::param`].
    pub fn new(name: impl Into<Arc<str>>, arity: u8) -> Self {
        Self {
            name: name.into(),
            arity,
            next_register: u16::from(arity),
            instructions: Vec::new(),
            constants: Vec::new(),
            names: Vec::new(),
            name_map: FxHashMap::default(),
            procedures: Vec::new(),
            labels: Vec::new(),
            forward_refs: Vec::new(),
            error: None,
        }
    }

    /// Register holding parameter `index`.
    #[inline]
    pub fn param(&self, index: u8) -> Register {
        debug_assert!(index < self.arity, "parameter {} out of range", index);
        Register(index)
    }

    /// Number of instructions emitted so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if nothing has been emitted.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    fn record(&mut self, error: BuildError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    // =========================================================================
    // Registers & Pools
    // =========================================================================

    /// Allocate a fresh register.
    pub fn alloc_register(&mut self) -> Register {
        self.alloc_window(0)
    }

    /// Allocate `argc + 1` consecutive registers for a call site.
    fn alloc_window(&mut self, argc: usize) -> Register {
        let start = self.next_register;
        let end = usize::from(start) + argc + 1;
        if end > usize::from(MAX_REGISTERS) {
            let procedure = self.name.clone();
            self.record(BuildError::TooManyRegisters { procedure });
            return Register(0);
        }
        self.next_register = end as u16;
        Register(start as u8)
    }

    /// Add a constant, returning its pool index.
    pub fn add_constant(&mut self, value: impl Into<Value>) -> u16 {
        let index = self.constants.len();
        if index > usize::from(u16::MAX) {
            let procedure = self.name.clone();
            self.record(BuildError::PoolOverflow {
                procedure,
                pool: "constant",
            });
            return 0;
        }
        self.constants.push(value.into());
        index as u16
    }

    /// Intern a native function name, returning its pool index.
    pub fn add_name(&mut self, name: &str) -> u8 {
        if let Some(&index) = self.name_map.get(name) {
            return index;
        }
        let index = self.names.len();
        if index > usize::from(u8::MAX) {
            let procedure = self.name.clone();
            self.record(BuildError::PoolOverflow {
                procedure,
                pool: "name",
            });
            return 0;
        }
        let name: Arc<str> = name.into();
        self.names.push(name.clone());
        self.name_map.insert(name, index as u8);
        index as u8
    }

    /// Add a callee, returning its pool index.
    pub fn add_procedure(&mut self, procedure: Arc<Procedure>) -> u8 {
        if let Some(index) = self
            .procedures
            .iter()
            .position(|p| Arc::ptr_eq(p, &procedure))
        {
            return index as u8;
        }
        let index = self.procedures.len();
        if index > usize::from(u8::MAX) {
            let name = self.name.clone();
            self.record(BuildError::PoolOverflow {
                procedure: name,
                pool: "procedure",
            });
            return 0;
        }
        self.procedures.push(procedure);
        index as u8
    }

    // =========================================================================
    // Labels
    // =========================================================================

    /// Create a new, unbound label.
    pub fn new_label(&mut self) -> Label {
        let label = Label(self.labels.len() as u32);
        self.labels.push(None);
        label
    }

    /// Bind `label` to the next emitted instruction.
    pub fn bind_label(&mut self, label: Label) {
        match u16::try_from(self.instructions.len()) {
            Ok(position) => self.labels[label.0 as usize] = Some(position),
            Err(_) => {
                let procedure = self.name.clone();
                self.record(BuildError::JumpOutOfRange { procedure });
            }
        }
    }

    fn emit_branch(&mut self, opcode: Opcode, register: Register, label: Label) {
        self.forward_refs.push(ForwardRef {
            instruction_index: self.instructions.len(),
            opcode,
            register,
            label,
        });
        self.emit(Instruction::op_di(opcode, register, 0));
    }

    // =========================================================================
    // Emission
    // =========================================================================

    /// Emit a raw instruction.
    #[inline]
    pub fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Emit `Nop`.
    pub fn emit_nop(&mut self) {
        self.emit(Instruction::op(Opcode::Nop));
    }

    /// dst = value (via the constant pool).
    pub fn emit_load_const(&mut self, dst: Register, value: impl Into<Value>) {
        let index = self.add_constant(value);
        self.emit(Instruction::op_di(Opcode::LoadConst, dst, index));
    }

    /// dst = integer literal.
    pub fn emit_load_int(&mut self, dst: Register, value: i64) {
        self.emit_load_const(dst, value);
    }

    /// dst = None.
    pub fn emit_load_none(&mut self, dst: Register) {
        self.emit(Instruction::op_d(Opcode::LoadNone, dst));
    }

    /// dst = src.
    pub fn emit_move(&mut self, dst: Register, src: Register) {
        self.emit(Instruction::op_ds(Opcode::Move, dst, src));
    }

    /// dst = lhs + rhs.
    pub fn emit_add(&mut self, dst: Register, lhs: Register, rhs: Register) {
        self.emit(Instruction::op_dss(Opcode::Add, dst, lhs, rhs));
    }

    /// dst = lhs - rhs.
    pub fn emit_sub(&mut self, dst: Register, lhs: Register, rhs: Register) {
        self.emit(Instruction::op_dss(Opcode::Sub, dst, lhs, rhs));
    }

    /// dst = lhs * rhs.
    pub fn emit_mul(&mut self, dst: Register, lhs: Register, rhs: Register) {
        self.emit(Instruction::op_dss(Opcode::Mul, dst, lhs, rhs));
    }

    /// dst = lhs < rhs.
    pub fn emit_lt(&mut self, dst: Register, lhs: Register, rhs: Register) {
        self.emit(Instruction::op_dss(Opcode::Lt, dst, lhs, rhs));
    }

    /// dst = lhs == rhs.
    pub fn emit_eq(&mut self, dst: Register, lhs: Register, rhs: Register) {
        self.emit(Instruction::op_dss(Opcode::Eq, dst, lhs, rhs));
    }

    /// Unconditional jump to `label`.
    pub fn emit_jump(&mut self, label: Label) {
        self.emit_branch(Opcode::Jump, Register(0), label);
    }

    /// Jump to `label` if `cond` is falsy.
    pub fn emit_jump_if_false(&mut self, cond: Register, label: Label) {
        self.emit_branch(Opcode::JumpIfFalse, cond, label);
    }

    /// dst = {}.
    pub fn emit_new_dict(&mut self, dst: Register) {
        self.emit(Instruction::op_d(Opcode::NewDict, dst));
    }

    /// dst = container[key].
    pub fn emit_get_item(&mut self, dst: Register, container: Register, key: Register) {
        self.emit(Instruction::op_dss(Opcode::GetItem, dst, container, key));
    }

    /// container[key] = value.
    pub fn emit_set_item(&mut self, container: Register, key: Register, value: Register) {
        self.emit(Instruction::op_dss(Opcode::SetItem, container, key, value));
    }

    /// Raise an exception carrying the value in `src`.
    pub fn emit_raise(&mut self, src: Register) {
        self.emit(Instruction::op_d(Opcode::Raise, src));
    }

    /// Return the value in `src`.
    pub fn emit_return(&mut self, src: Register) {
        self.emit(Instruction::op_d(Opcode::Return, src));
    }

    /// Return None.
    pub fn emit_return_none(&mut self) {
        self.emit(Instruction::op(Opcode::ReturnNone));
    }

    /// Copy `args` into a fresh call window and return the window register.
    fn emit_call_window(&mut self, args: &[Register]) -> Option<(Register, u8)> {
        let Ok(argc) = u8::try_from(args.len()) else {
            let procedure = self.name.clone();
            self.record(BuildError::TooManyArguments {
                procedure,
                count: args.len(),
            });
            return None;
        };
        let window = self.alloc_window(args.len());
        for (i, &arg) in args.iter().enumerate() {
            self.emit_move(window.offset(i as u8 + 1), arg);
        }
        Some((window, argc))
    }

    /// dst = procedure(args...).
    pub fn emit_call(&mut self, dst: Register, procedure: &Arc<Procedure>, args: &[Register]) {
        let index = self.add_procedure(Arc::clone(procedure));
        if let Some((window, argc)) = self.emit_call_window(args) {
            self.emit(Instruction::new(Opcode::Call, window.0, index, argc));
            self.emit_move(dst, window);
        }
    }

    /// dst = native(args...).
    pub fn emit_call_native(&mut self, dst: Register, native: &str, args: &[Register]) {
        let index = self.add_name(native);
        if let Some((window, argc)) = self.emit_call_window(args) {
            self.emit(Instruction::new(Opcode::CallNative, window.0, index, argc));
            self.emit_move(dst, window);
        }
    }

    /// dst = yield(value?); `dst` receives the holder for the next inbound value.
    pub fn emit_yield(&mut self, dst: Register, value: Option<Register>) {
        match value {
            Some(value) => self.emit_call_native(dst, "yield", &[value]),
            None => self.emit_call_native(dst, "yield", &[]),
        }
    }

    /// dst = retrieve(holder).
    pub fn emit_retrieve(&mut self, dst: Register, holder: Register) {
        self.emit_call_native(dst, "retrieve", &[holder]);
    }

    // =========================================================================
    // Finish
    // =========================================================================

    /// Resolve labels and produce the procedure.
    pub fn finish(self) -> Result<Arc<Procedure>, BuildError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut instructions = self.instructions;
        for fref in &self.forward_refs {
            let target = self.labels[fref.label.0 as usize].ok_or_else(|| {
                BuildError::UnboundLabel {
                    procedure: self.name.clone(),
                    label: fref.label.0,
                }
            })?;
            instructions[fref.instruction_index] =
                Instruction::op_di(fref.opcode, fref.register, target);
        }

        Ok(Arc::new(Procedure {
            name: self.name,
            arity: self.arity,
            register_count: self.next_register,
            instructions: instructions.into_boxed_slice(),
            constants: self.constants.into_boxed_slice(),
            names: self.names.into_boxed_slice(),
            procedures: self.procedures.into_boxed_slice(),
        }))
    }
}
