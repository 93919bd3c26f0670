//! The container façade.
//!
//! Owns the registered node list, the value cache, and the cleanup stack
//! behind one lock. Meant for a one-shot startup sequence: accumulate
//! constructors with [`Container::add`], resolve and execute them with
//! [`Container::run`], release everything with [`Container::cleanup`].

use crate::engine::Engine;
use crate::error::{CleanupError, RunError};
use crate::node::{Construct, Node, Produced};
use crate::populate::{Inject, Shared, Target};
use rigging_core::{CapabilityKey, OutputSlot, Resource};
use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Label of the self-registered node producing the shutdown signal.
const CONTEXT_LABEL: &str = "built-in shutdown signal";

struct Inner {
    nodes: Vec<Node>,
    seen: HashSet<TypeId>,
    engine: Engine,
    // First registration failure; persists so every later run reports it.
    deferred: Option<String>,
    ran: bool,
    token: CancellationToken,
}

/// Startup-time object-graph assembler.
///
/// Constructors declare what they consume and produce through their
/// signatures; the container resolves a construction order from those
/// manifests, executes it once, and tears down produced resources in
/// reverse order.
///
/// ```
/// use rigging_core::Resource;
/// use rigging_runtime::Container;
/// use std::sync::Arc;
///
/// struct Config { port: u16 }
/// impl Resource for Config {}
///
/// struct Server { port: u16 }
/// impl Resource for Server {}
///
/// let container = Container::new();
/// container
///     .add(|| Config { port: 8080 })
///     .add(|cfg: Arc<Config>| Server { port: cfg.port });
///
/// container.run()?;
/// container.cleanup()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Container {
    inner: Mutex<Inner>,
}

impl Container {
    /// Create an empty container.
    ///
    /// A node producing the [`CancellationToken`] shutdown signal is
    /// self-registered, so any constructor may take it as an input.
    /// [`Container::cleanup`] cancels the signal before releasing
    /// anything.
    #[must_use]
    pub fn new() -> Self {
        let token = CancellationToken::new();
        Self {
            inner: Mutex::new(Inner {
                nodes: vec![context_node(token.clone())],
                seen: HashSet::new(),
                engine: Engine::new(),
                deferred: None,
                ran: false,
                token,
            }),
        }
    }

    /// Derive the shutdown signal from a caller-supplied token.
    ///
    /// The container's signal becomes a child of `parent`: cancelling the
    /// parent propagates in, and [`Container::cleanup`] still cancels the
    /// derived signal on its own.
    #[must_use]
    pub fn with_context(mut self, parent: &CancellationToken) -> Self {
        {
            let inner = self.inner.get_mut().unwrap();
            let token = parent.child_token();
            inner.token = token.clone();
            inner.nodes[0] = context_node(token);
        }
        self
    }

    /// Register a constructor.
    ///
    /// Chainable; failures are deferred and returned by the next
    /// [`Container::run`]. Registering the same function item twice is
    /// idempotent: it executes once and its outputs are produced once.
    pub fn add<C, M>(&self, constructor: C) -> &Self
    where
        C: Construct<M>,
    {
        let mut inner = self.inner.lock().unwrap();
        if inner.deferred.is_some() {
            return self;
        }
        if inner.ran {
            inner.deferred = Some("constructor added after run".to_string());
            return self;
        }
        if !inner.seen.insert(TypeId::of::<C>()) {
            return self;
        }
        inner.nodes.push(constructor.into_node());
        self
    }

    /// Register a population target: after a successful run, `target`
    /// holds the value produced for `T`.
    pub fn populate<T: Resource>(&self, target: &Target<T>) -> &Self {
        self.add_synthetic(target.node())
    }

    /// Register a struct-injection target: after a successful run, the
    /// fields declared by [`Inject::inputs`] are filled from produced
    /// values.
    pub fn inject<S: Inject>(&self, shared: &Shared<S>) -> &Self {
        self.add_synthetic(shared.node())
    }

    fn add_synthetic(&self, node: Node) -> &Self {
        let mut inner = self.inner.lock().unwrap();
        if inner.deferred.is_some() {
            return self;
        }
        if inner.ran {
            inner.deferred = Some("target added after run".to_string());
            return self;
        }
        inner.nodes.push(node);
        self
    }

    /// Resolve the capability graph and execute every node in order.
    ///
    /// Resolution failures abort before any constructor runs. A
    /// constructor failure aborts the run immediately; values and release
    /// actions from constructors that already ran are kept, so
    /// [`Container::cleanup`] after a failed run releases whatever was
    /// constructed.
    ///
    /// # Errors
    ///
    /// Returns the first deferred registration failure, a
    /// [`ResolveError`](rigging_graph::ResolveError) for duplicate
    /// providers, missing dependencies, or cycles, or the first
    /// constructor-surfaced error. A second call is a registration error.
    pub fn run(&self) -> Result<(), RunError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(reason) = inner.deferred.clone() {
            return Err(RunError::Registration { reason });
        }
        if inner.ran {
            return Err(RunError::Registration {
                reason: "container already ran".to_string(),
            });
        }
        inner.ran = true;

        let order = rigging_graph::resolve(&inner.nodes)?;
        tracing::debug!(nodes = inner.nodes.len(), "executing construction order");

        let Inner { nodes, engine, .. } = &mut *inner;
        engine.execute(nodes, &order)
    }

    /// Cancel the shutdown signal, then run every release action in
    /// reverse construction order.
    ///
    /// A failing action never stops the others; each runs exactly once
    /// and a second `cleanup` finds nothing left to release.
    ///
    /// # Errors
    ///
    /// Returns a [`CleanupError`] aggregating every teardown failure.
    pub fn cleanup(&self) -> Result<(), CleanupError> {
        let mut inner = self.inner.lock().unwrap();
        inner.token.cancel();
        tracing::debug!("releasing constructed resources");

        let failures = inner.engine.release_all();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(CleanupError::new(failures))
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

fn context_node(token: CancellationToken) -> Node {
    Node::from_parts(
        CONTEXT_LABEL.to_string(),
        Vec::new(),
        vec![OutputSlot::value(CapabilityKey::of::<CancellationToken>())],
        Box::new(move |_cache| Ok(vec![Produced::of(token.clone())])),
    )
}
