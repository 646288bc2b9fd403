//! Register bytecode executed by contexts.
//!
//! Instructions are packed 32-bit words (see [`instruction`]); procedures
//! bundle an instruction stream with its pools; [`ProcedureBuilder`] is the
//! supported way to produce them.

pub mod builder;
pub mod instruction;
pub mod procedure;

pub use builder::{BuildError, Label, ProcedureBuilder, MAX_REGISTERS};
pub use instruction::{Instruction, InstructionFormat, Opcode, Register};
pub use procedure::Procedure;
