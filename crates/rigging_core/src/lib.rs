//! RIGGING Core Types
//!
//! This crate contains the leaf vocabulary of the object-graph assembler:
//! capability keys, declared output slots, and the resource contract for
//! produced values.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod key;
pub mod resource;

// Re-exports
pub use key::{CapabilityKey, OutputSlot};
pub use resource::{BoxError, ReleaseFn, Resource};
