//! Errors surfaced by the container.

use rigging_core::{BoxError, CapabilityKey};
use rigging_graph::ResolveError;
use std::fmt;
use thiserror::Error;

/// Error returned by [`Container::run`](crate::Container::run).
#[derive(Debug, Error)]
pub enum RunError {
    /// A registration was rejected. Deferred from the `add` call that
    /// caused it and returned by the next `run`.
    #[error("registration failed: {reason}")]
    Registration {
        /// Why the registration was rejected.
        reason: String,
    },

    /// The capability graph could not be resolved. Nothing was
    /// constructed.
    #[error(transparent)]
    Resolve(#[from] ResolveError<CapabilityKey>),

    /// A fallible output slot carried an error, propagated verbatim.
    #[error("{0}")]
    Constructor(BoxError),

    /// A required value was absent from the cache at execution time.
    /// The resolver orders producers before consumers, so this points at
    /// a resolver or engine bug rather than user code.
    #[error("internal error: no value for {key} while constructing {node}")]
    Internal {
        /// The absent capability.
        key: CapabilityKey,
        /// Label of the node under construction.
        node: String,
    },
}

impl RunError {
    /// The constructor-surfaced error, if that is what aborted the run.
    #[must_use]
    pub fn constructor_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Constructor(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Aggregate of individual teardown failures.
///
/// Cleanup never stops at a failure: every registered release action is
/// attempted exactly once and all failures land here, in teardown order.
#[derive(Debug)]
pub struct CleanupError {
    failures: Vec<BoxError>,
}

impl CleanupError {
    pub(crate) fn new(failures: Vec<BoxError>) -> Self {
        Self { failures }
    }

    /// The individual failures, in teardown order.
    #[must_use]
    pub fn failures(&self) -> &[BoxError] {
        &self.failures
    }
}

impl fmt::Display for CleanupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cleanup errors: ")?;
        for (i, err) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CleanupError {}
