//! Compiled procedures.
//!
//! A `Procedure` is the unit a context executes: straight-line register
//! bytecode plus the pools its instructions index into. Procedures are
//! immutable once built and shared by `Arc`, so any number of contexts (and
//! therefore generators) can run the same procedure at once.

use super::instruction::{Instruction, Opcode};
use cogen_core::Value;
use std::fmt;
use std::sync::Arc;

/// An executable procedure.
pub struct Procedure {
    /// Procedure name, used in tracebacks.
    pub name: Arc<str>,
    /// Number of parameters, bound to `r0..arity`.
    pub arity: u8,
    /// Registers the frame must provide.
    pub register_count: u16,
    /// Instruction stream.
    pub instructions: Box<[Instruction]>,
    /// Constant pool.
    pub constants: Box<[Value]>,
    /// Native function names referenced by `CallNative`.
    pub names: Box<[Arc<str>]>,
    /// Procedures referenced by `Call`.
    pub procedures: Box<[Arc<Procedure>]>,
}

impl Procedure {
    /// Number of instructions.
    #[inline]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true for a procedure with no instructions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Human-readable listing, one instruction per line.
    pub fn disassemble(&self) -> String {
        let mut out = format!("procedure {}({} args):\n", self.name, self.arity);
        for (ip, inst) in self.instructions.iter().enumerate() {
            out.push_str(&format!("  {:04} {}", ip, inst));
            if Opcode::from_u8(inst.opcode()) == Some(Opcode::CallNative) {
                if let Some(name) = self.names.get(inst.src1().0 as usize) {
                    out.push_str(&format!("    ; {}", name));
                }
            }
            out.push('\n');
        }
        out
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("register_count", &self.register_count)
            .field("instructions", &self.instructions.len())
            .finish()
    }
}
