//! Cooperative generators.
//!
//! A generator runs a one-argument procedure on a context of its own and
//! stops it at each `yield`, handing a value out and taking one back in on
//! the next step.
//!
//! # Architecture
//!
//! - **State header**: one atomic word holds lifecycle state and yield count
//! - **Exchange slots**: an outbound holder filled by `yield`, an inbound
//!   holder filled by the caller
//! - **Yield link**: the capability that marks a context as generator-owned;
//!   `yield` without it faults instead of suspending
//!
//! # Example
//!
//! ```
//! use cogen_vm::bytecode::ProcedureBuilder;
//! use cogen_vm::generators::Generator;
//! use cogen_vm::Engine;
//!
//! // yield(1); yield(2); return
//! let mut b = ProcedureBuilder::new("pair", 1);
//! let (v, reply) = (b.alloc_register(), b.alloc_register());
//! b.emit_load_int(v, 1);
//! b.emit_yield(reply, Some(v));
//! b.emit_load_int(v, 2);
//! b.emit_yield(reply, Some(v));
//! b.emit_return_none();
//!
//! let engine = Engine::new();
//! let generator = Generator::new(&engine, b.finish().unwrap(), ()).unwrap();
//! assert!(generator.step().unwrap());
//! assert_eq!(generator.value().retrieve_int(), Some(1));
//! assert!(generator.step().unwrap());
//! assert_eq!(generator.value().retrieve_int(), Some(2));
//! assert!(!generator.step().unwrap());
//! ```

mod exchange;
mod iterator;
mod object;
mod state;

pub use exchange::{native_yield, register_generator_support, ExchangeSlots, YieldLink};
pub use iterator::{GeneratorError, GeneratorIter};
pub use object::{create_generator, Generator, GeneratorId, GeneratorStats};
pub use state::{GeneratorHeader, GeneratorState};
