//! Population targets.
//!
//! Synthetic zero-output nodes that move produced values into
//! caller-owned destinations: [`Target`] for a single value, [`Shared`]
//! plus [`Inject`] for a struct of them.

use crate::cache::ValueCache;
use crate::node::{InvokeError, Node};
use rigging_core::{CapabilityKey, Resource};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

/// A write-once destination for the value produced for `T`.
///
/// Clones share the same slot. Register with
/// [`Container::populate`](crate::Container::populate); after a
/// successful run, [`Target::get`] yields the produced value. With no
/// producer for `T` registered, the run fails with a missing-dependency
/// error naming the target.
pub struct Target<T> {
    slot: Arc<OnceLock<Arc<T>>>,
}

impl<T> Clone for Target<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Resource> Target<T> {
    /// Create an empty target.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Arc::new(OnceLock::new()),
        }
    }

    /// The populated value, once a run has produced it.
    #[must_use]
    pub fn get(&self) -> Option<Arc<T>> {
        self.slot.get().cloned()
    }

    pub(crate) fn node(&self) -> Node {
        let key = CapabilityKey::of::<T>();
        let slot = Arc::clone(&self.slot);
        Node::from_parts(
            format!("population target for {key}"),
            vec![key],
            Vec::new(),
            Box::new(move |cache: &ValueCache| {
                let value = cache.get::<T>().ok_or(InvokeError::MissingValue(key))?;
                let _ = slot.set(value);
                Ok(Vec::new())
            }),
        )
    }
}

impl<T: Resource> Default for Target<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A struct whose fields are filled from produced values.
///
/// Declare the consumed keys in [`Inject::inputs`] and move the values
/// into place in [`Inject::fill`]; the container registers a synthetic
/// zero-output node from this manifest, so the declared producers are
/// ordered before the fill.
///
/// ```
/// use rigging_core::{CapabilityKey, Resource};
/// use rigging_runtime::{Inject, ValueCache};
/// use std::sync::Arc;
///
/// struct Config;
/// impl Resource for Config {}
///
/// #[derive(Default)]
/// struct Wiring {
///     config: Option<Arc<Config>>,
/// }
///
/// impl Inject for Wiring {
///     fn inputs() -> Vec<CapabilityKey> {
///         vec![CapabilityKey::of::<Config>()]
///     }
///
///     fn fill(&mut self, values: &ValueCache) {
///         self.config = values.get();
///     }
/// }
/// ```
pub trait Inject: Send + 'static {
    /// Capability keys of the values this struct consumes.
    fn inputs() -> Vec<CapabilityKey>;

    /// Move the produced values into place. Every key declared by
    /// [`Inject::inputs`] is present in `values` when this runs.
    fn fill(&mut self, values: &ValueCache);
}

/// Shared handle to an injection target, usable before and after the run.
///
/// Clones share the same target.
pub struct Shared<S> {
    target: Arc<Mutex<S>>,
}

impl<S> Clone for Shared<S> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
        }
    }
}

impl<S: Inject> Shared<S> {
    /// Wrap an injection target.
    #[must_use]
    pub fn new(target: S) -> Self {
        Self {
            target: Arc::new(Mutex::new(target)),
        }
    }

    /// Lock the target for inspection or use.
    #[must_use]
    pub fn lock(&self) -> MutexGuard<'_, S> {
        self.target.lock().unwrap()
    }

    pub(crate) fn node(&self) -> Node {
        let inputs = S::inputs();
        let keys = inputs.clone();
        let target = Arc::clone(&self.target);
        Node::from_parts(
            format!("injection target for {}", std::any::type_name::<S>()),
            inputs,
            Vec::new(),
            Box::new(move |cache: &ValueCache| {
                for &key in &keys {
                    if !cache.contains(key) {
                        return Err(InvokeError::MissingValue(key));
                    }
                }
                target.lock().unwrap().fill(cache);
                Ok(Vec::new())
            }),
        )
    }
}
