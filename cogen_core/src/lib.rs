//! # Cogen Core
//!
//! Value types shared by the cogen host and its generator protocol.
//!
//! - **Value System**: tagged union over the host's native payloads plus
//!   holder and arbitrary-object references
//! - **Dictionaries**: shared, string-keyed maps used as procedure arguments
//! - **Value Holders**: type-erased, reference-counted containers that carry
//!   values across a suspension boundary
//! - **Error Handling**: result types for conversions and container access

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod dict;
pub mod error;
pub mod holder;
pub mod value;

pub use dict::Dictionary;
pub use error::{CoreError, CoreResult};
pub use holder::ValueHolder;
pub use value::{ObjectRef, TypeTag, Value};

/// Cogen version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
