//! RIGGING Graph Resolver
//!
//! Computes a valid construction order for a set of registered nodes:
//! maps each capability key to its unique producer, detects missing
//! dependencies and cycles, and yields a total order consistent with
//! dependencies.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod resolve;

pub use resolve::{resolve, GraphNode, ResolveError};
