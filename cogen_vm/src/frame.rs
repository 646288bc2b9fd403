//! Call frames.
//!
//! A frame is one procedure activation on a context's frame stack. Its
//! register file lives inline for small procedures and spills to the heap for
//! large ones.

use crate::bytecode::{Instruction, Procedure, Register};
use cogen_core::Value;
use smallvec::SmallVec;
use std::sync::Arc;

/// Registers stored inline before the file spills to the heap.
pub const INLINE_REGISTERS: usize = 16;

/// A call frame representing a procedure invocation.
pub struct Frame {
    /// Procedure being executed.
    pub procedure: Arc<Procedure>,

    /// Instruction pointer (index into `procedure.instructions`).
    pub ip: u32,

    /// Register in the caller frame that receives the return value.
    /// None for the entry frame.
    pub return_reg: Option<u8>,

    /// Register file. Parameters are passed in r0, r1, ...
    pub registers: SmallVec<[Value; INLINE_REGISTERS]>,
}

impl Frame {
    /// Create a frame with every register set to None.
    pub fn new(procedure: Arc<Procedure>, return_reg: Option<u8>) -> Self {
        let count = usize::from(procedure.register_count).max(usize::from(procedure.arity));
        let mut registers = SmallVec::with_capacity(count);
        registers.resize(count, Value::None);
        Self {
            procedure,
            ip: 0,
            return_reg,
            registers,
        }
    }

    // =========================================================================
    // Register Access
    // =========================================================================

    /// Get a register value. Registers past the file read as None.
    #[inline]
    pub fn get_reg(&self, reg: Register) -> Value {
        self.registers
            .get(reg.index() as usize)
            .cloned()
            .unwrap_or_default()
    }

    /// Set a register value, growing the file if needed.
    #[inline]
    pub fn set_reg(&mut self, reg: Register, value: Value) {
        let index = reg.index() as usize;
        if index >= self.registers.len() {
            self.registers.resize(index + 1, Value::None);
        }
        self.registers[index] = value;
    }

    /// Clone `count` consecutive registers starting at `start`.
    pub fn window(&self, start: Register, count: u8) -> SmallVec<[Value; 4]> {
        (0..count).map(|i| self.get_reg(start.offset(i))).collect()
    }

    // =========================================================================
    // Instruction Fetching
    // =========================================================================

    /// Fetch the current instruction and advance IP.
    #[inline]
    pub fn fetch(&mut self) -> Option<Instruction> {
        let inst = self.procedure.instructions.get(self.ip as usize).copied()?;
        self.ip += 1;
        Some(inst)
    }

    /// Get a constant from the constant pool.
    #[inline]
    pub fn get_const(&self, idx: u16) -> Option<&Value> {
        self.procedure.constants.get(idx as usize)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("procedure", &self.procedure.name)
            .field("ip", &self.ip)
            .field("return_reg", &self.return_reg)
            .finish()
    }
}
