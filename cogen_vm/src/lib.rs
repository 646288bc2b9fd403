//! Suspendable bytecode host with cooperative generators.
//!
//! This crate provides a small register-based interpreter whose executions
//! can stop mid-procedure and continue later, and a generator abstraction
//! built on top of it:
//!
//! - **Contexts**: pooled, preparable, suspendable units of execution
//! - **Dispatch loop**: runs a context until it returns, faults, or a native
//!   asks it to suspend
//! - **Natives**: host functions receiving an explicit call handle, never a
//!   global "current context"
//! - **Generators**: step-and-exchange protocol over one owned context, with
//!   `yield` as the only suspension point
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                      Engine                      │
//! ├──────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────────────────┐  │
//! │  │ ContextPool  │  │ NativeRegistry           │  │
//! │  │ (idle list)  │  │ (yield, retrieve, len..) │  │
//! │  └──────────────┘  └──────────────────────────┘  │
//! │  ┌──────────────┐  ┌──────────────────────────┐  │
//! │  │ Heap         │  │ EngineConfig             │  │
//! │  │ (weak refs)  │  │ (limits, collection)     │  │
//! │  └──────────────┘  └──────────────────────────┘  │
//! └──────────────────────────────────────────────────┘
//!           ▲ acquire / release
//! ┌─────────┴────────┐        ┌─────────────────────┐
//! │ Generator        │──link─▶│ ExchangeSlots       │
//! │ (owns a Context) │        │ (outbound, inbound) │
//! └──────────────────┘        └─────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use cogen_vm::bytecode::ProcedureBuilder;
//! use cogen_vm::{Engine, Generator};
//!
//! // reply = yield(arg); return
//! let mut b = ProcedureBuilder::new("echo", 1);
//! let reply = b.alloc_register();
//! b.emit_yield(reply, Some(b.param(0)));
//! b.emit_return_none();
//! let echo = b.finish().unwrap();
//!
//! let engine = Engine::new();
//! let generator = Generator::new(&engine, echo, 42_i64).unwrap();
//! assert!(generator.step().unwrap());
//! assert_eq!(generator.value().retrieve_int(), Some(42));
//! assert!(!generator.step().unwrap());
//! ```

#![deny(unsafe_op_in_unsafe_fn)]

// Core modules
pub mod context;
pub mod error;
pub mod frame;

// Bytecode
pub mod bytecode;

// Execution infrastructure
pub mod builtins;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod heap;
pub mod native;
pub mod pool;

// Opcode semantics
pub mod ops;

// Generator protocol
pub mod generators;

// Re-exports
pub use config::EngineConfig;
pub use context::{Context, ContextId, ContextState};
pub use dispatch::ExecutionOutcome;
pub use engine::Engine;
pub use error::{RuntimeError, RuntimeErrorKind, TracebackEntry, VmResult};
pub use frame::Frame;
pub use generators::{
    create_generator, register_generator_support, Generator, GeneratorError, GeneratorState,
    GeneratorStats,
};
pub use heap::{CollectMode, Heap, HeapStats};
pub use native::{NativeCall, NativeFn, NativeRegistry};
pub use pool::PoolStats;

/// Convenience function to run an ordinary procedure on a fresh engine.
pub fn run(
    procedure: std::sync::Arc<bytecode::Procedure>,
    args: &[cogen_core::Value],
) -> VmResult<cogen_core::Value> {
    Engine::new().call(procedure, args)
}
