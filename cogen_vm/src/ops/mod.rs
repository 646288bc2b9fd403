//! Opcode semantics.
//!
//! Value-level behavior of the data opcodes, kept apart from the dispatch
//! loop so it can be tested without building procedures.

pub mod arithmetic;
pub mod comparison;
pub mod containers;
