//! RIGGING Runtime
//!
//! Execution half of the object-graph assembler: constructor
//! registration and erasure, ordered execution against a write-once
//! value cache, population targets, and reverse-order teardown, all
//! behind the [`Container`] façade.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod container;
mod engine;
pub mod error;
pub mod node;
pub mod populate;

pub use cache::ValueCache;
pub use container::Container;
pub use error::{CleanupError, RunError};
pub use node::{Construct, Fallible, IntoOutputs, Node, Produced, Slot, Value};
pub use populate::{Inject, Shared, Target};
