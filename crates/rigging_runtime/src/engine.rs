//! Ordered execution over the value cache and the cleanup stack.

use crate::cache::ValueCache;
use crate::error::RunError;
use crate::node::{InvokeError, Node};
use rigging_core::{BoxError, ReleaseFn};

/// Invokes nodes in resolved order, caching produced values and recording
/// their release actions in construction order.
pub(crate) struct Engine {
    cache: ValueCache,
    cleanups: Vec<ReleaseFn>,
}

impl Engine {
    pub(crate) fn new() -> Self {
        Self {
            cache: ValueCache::new(),
            cleanups: Vec::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &ValueCache {
        &self.cache
    }

    /// Invoke every node named by `order`, front to back.
    ///
    /// The first failure aborts the run. Values and release actions from
    /// nodes that already ran are kept, so cleanup after a failed run
    /// releases whatever was constructed.
    pub(crate) fn execute(&mut self, nodes: &mut [Node], order: &[usize]) -> Result<(), RunError> {
        for &idx in order {
            let produced = {
                let node = &mut nodes[idx];
                tracing::debug!(node = node.label(), "constructing");
                node.invoke(&self.cache).map_err(|err| match err {
                    InvokeError::MissingValue(key) => RunError::Internal {
                        key,
                        node: node.label().to_string(),
                    },
                    InvokeError::Constructor(err) => RunError::Constructor(err),
                })?
            };

            for item in produced {
                let (key, value, release) = item.into_parts();
                self.cache.insert(key, value);
                if let Some(release) = release {
                    self.cleanups.push(release);
                }
            }
        }
        Ok(())
    }

    /// Drain the cleanup stack in reverse order, collecting failures.
    ///
    /// Every release action runs exactly once; a failure never stops the
    /// drain. A second call finds the stack empty.
    pub(crate) fn release_all(&mut self) -> Vec<BoxError> {
        let mut failures = Vec::new();
        while let Some(release) = self.cleanups.pop() {
            if let Err(err) = release() {
                tracing::warn!(error = %err, "release action failed");
                failures.push(err);
            }
        }
        failures
    }
}
