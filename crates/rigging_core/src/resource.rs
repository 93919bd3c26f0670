//! The contract for values produced into the graph.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Boxed error carried by fallible output slots and release actions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A deferred release action, run exactly once in reverse construction
/// order during container cleanup.
pub type ReleaseFn = Box<dyn FnOnce() -> Result<(), BoxError> + Send>;

/// Contract implemented by every value type a constructor produces.
///
/// Produced values are shared as `Arc<T>` through the value cache, so the
/// trait requires `Send + Sync + 'static`. Types that own something
/// needing teardown override [`Resource::release`]; the returned action is
/// appended to the cleanup stack when the value is constructed and runs in
/// reverse construction order.
///
/// ```
/// use rigging_core::{BoxError, ReleaseFn, Resource};
/// use std::sync::Arc;
///
/// struct Listener { /* socket, worker handle, ... */ }
///
/// impl Listener {
///     fn close(&self) -> Result<(), BoxError> {
///         Ok(())
///     }
/// }
///
/// impl Resource for Listener {
///     fn release(self: Arc<Self>) -> Option<ReleaseFn> {
///         Some(Box::new(move || self.close()))
///     }
/// }
/// ```
pub trait Resource: Send + Sync + 'static {
    /// The release action for this value, if it owns one.
    fn release(self: Arc<Self>) -> Option<ReleaseFn> {
        None
    }
}

// The built-in shutdown signal flows through the cache like any other
// capability. Cancellation happens via the container, not via release.
impl Resource for CancellationToken {}
