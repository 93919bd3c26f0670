//! Producer mapping, missing-dependency detection, cycle detection, and
//! topological ordering.
//!
//! The resolver is generic over the key type so it can be exercised with
//! synthetic keys; the runtime instantiates it with `CapabilityKey`.

use indexmap::IndexMap;
use std::fmt;
use std::hash::Hash;
use thiserror::Error;

/// Graph view of a registered node: a diagnostic label plus the capability
/// keys it consumes and produces, in declared order.
pub trait GraphNode {
    /// Capability key type identifying produced/consumed value types.
    type Key: Clone + Eq + Hash + fmt::Display;

    /// Human-readable label for diagnostics.
    fn label(&self) -> &str;

    /// Keys this node consumes, in declared order.
    fn inputs(&self) -> Vec<Self::Key>;

    /// Keys this node produces, in declared order.
    fn outputs(&self) -> Vec<Self::Key>;
}

/// Resolution failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError<K: fmt::Display> {
    /// Two nodes claim the same output key.
    #[error("duplicate provider for {key}: {first} and {second}")]
    DuplicateProvider {
        /// The doubly-produced key
        key: K,
        /// Label of the node that declared the key first
        first: String,
        /// Label of the node that declared it again
        second: String,
    },

    /// A consumed key has no producer.
    #[error("missing dependency {key} required by {node}")]
    MissingDependency {
        /// The unresolved key
        key: K,
        /// Label of the consuming node
        node: String,
    },

    /// Cyclic dependency. The path lists labels from the repeated node
    /// back to itself.
    #[error("cyclic dependency: {}", .path.join(" -> "))]
    Cycle {
        /// Ordered labels along the cycle
        path: Vec<String>,
    },
}

/// Resolve a construction order.
///
/// Returns indices into `nodes` such that every node appears after all
/// nodes it depends on. The result is deterministic for a fixed
/// registration order: the outer traversal visits nodes in registration
/// order and dependencies in input declaration order. No other relative
/// ordering among independent subgraphs is promised.
///
/// # Errors
///
/// Returns [`ResolveError::DuplicateProvider`] if two nodes declare the
/// same output key, [`ResolveError::MissingDependency`] if an input key
/// has no producer, and [`ResolveError::Cycle`] if the dependency relation
/// contains a cycle.
pub fn resolve<N: GraphNode>(nodes: &[N]) -> Result<Vec<usize>, ResolveError<N::Key>> {
    // 1. Map output keys to producers.
    let mut producers: IndexMap<N::Key, usize> = IndexMap::new();
    for (idx, node) in nodes.iter().enumerate() {
        for key in node.outputs() {
            if let Some(&existing) = producers.get(&key) {
                return Err(ResolveError::DuplicateProvider {
                    key,
                    first: nodes[existing].label().to_string(),
                    second: node.label().to_string(),
                });
            }
            producers.insert(key, idx);
        }
    }

    // 2. Build the dependency relation: consumer -> producers.
    let mut deps: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (idx, node) in nodes.iter().enumerate() {
        for key in node.inputs() {
            match producers.get(&key) {
                Some(&producer) => deps[idx].push(producer),
                None => {
                    return Err(ResolveError::MissingDependency {
                        key,
                        node: node.label().to_string(),
                    });
                }
            }
        }
    }

    // 3. Prove acyclicity, then order.
    check_cycles(nodes, &deps)?;
    let order = topo_order(&deps);

    tracing::debug!(
        nodes = nodes.len(),
        edges = deps.iter().map(Vec::len).sum::<usize>(),
        "resolved construction order"
    );

    Ok(order)
}

/// Depth-first cycle check over the dependency relation, driven by an
/// explicit work stack so pathologically deep graphs cannot exhaust the
/// call stack.
fn check_cycles<N: GraphNode>(
    nodes: &[N],
    deps: &[Vec<usize>],
) -> Result<(), ResolveError<N::Key>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        OnPath,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; nodes.len()];
    // Each frame is (node, offset of the next dependency to examine).
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..nodes.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::OnPath;
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            if frame.1 == deps[node].len() {
                marks[node] = Mark::Done;
                stack.pop();
                continue;
            }
            let dep = deps[node][frame.1];
            frame.1 += 1;

            match marks[dep] {
                Mark::OnPath => {
                    // The cycle runs from dep's position on the current
                    // path through `node` and back to dep.
                    let start = stack
                        .iter()
                        .position(|&(n, _)| n == dep)
                        .expect("node marked on-path is on the stack");
                    let mut path: Vec<String> = stack[start..]
                        .iter()
                        .map(|&(n, _)| nodes[n].label().to_string())
                        .collect();
                    path.push(nodes[dep].label().to_string());
                    return Err(ResolveError::Cycle { path });
                }
                Mark::Unvisited => {
                    marks[dep] = Mark::OnPath;
                    stack.push((dep, 0));
                }
                Mark::Done => {}
            }
        }
    }

    Ok(())
}

/// Post-order topological sort with an explicit work stack: dependencies
/// are appended before their dependents.
///
/// Assumes acyclicity was already proven, so no node can be re-reached
/// while still in progress and no cycle guard is needed.
fn topo_order(deps: &[Vec<usize>]) -> Vec<usize> {
    let mut done = vec![false; deps.len()];
    let mut order = Vec::with_capacity(deps.len());
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..deps.len() {
        if done[root] {
            continue;
        }
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            if frame.1 == deps[node].len() {
                stack.pop();
                done[node] = true;
                order.push(node);
                continue;
            }
            let dep = deps[node][frame.1];
            frame.1 += 1;
            if !done[dep] {
                stack.push((dep, 0));
            }
        }
    }

    order
}
