//! Arena-backed computation graph with dirty propagation and memoization

use ahash::{AHashMap, AHashSet};
use std::rc::Rc;
use thiserror::Error;

use super::node::{Compute, Inputs, NodeId, Outcome};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("unknown compute node {0}")]
    UnknownNode(NodeId),

    #[error("linking '{node}' to '{upstream}' would create a cycle")]
    Cycle { node: String, upstream: String },

    #[error("node '{node}' failed: {message}")]
    ComputeFailed { node: String, message: String },

    #[error("node '{0}' is not an input node")]
    NotASource(String),
}

enum NodeKind<V> {
    /// Value supplied from outside the graph
    Source(Rc<V>),
    Computed(Box<dyn Compute<V>>),
}

struct NodeSlot<V> {
    name: String,
    kind: NodeKind<V>,
    /// Upstream nodes and the input slot each one is bound to
    links: Vec<(NodeId, String)>,
    dependents: Vec<NodeId>,
    cached: Option<Outcome<V>>,
    dirty: bool,
    fail_soft: bool,
}

/// Incremental computation graph
///
/// Every mutation (`link_to`, `unlink`, `remove_node`, `set_value`) takes
/// `&mut self`, as does `update`, so a computation can never observe a
/// half-rewired input set.
pub struct ComputeGraph<V> {
    nodes: AHashMap<NodeId, NodeSlot<V>>,
    next_id: u64,
}

impl<V> Default for ComputeGraph<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ComputeGraph<V> {
    pub fn new() -> Self {
        Self {
            nodes: AHashMap::new(),
            next_id: 1,
        }
    }

    fn insert(&mut self, name: impl Into<String>, kind: NodeKind<V>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            NodeSlot {
                name: name.into(),
                kind,
                links: Vec::new(),
                dependents: Vec::new(),
                cached: None,
                dirty: true,
                fail_soft: false,
            },
        );
        id
    }

    /// Add an input node holding an externally supplied value
    pub fn add_source(&mut self, name: impl Into<String>, value: V) -> NodeId {
        self.insert(name, NodeKind::Source(Rc::new(value)))
    }

    /// Add a computed node with no links yet
    pub fn add_node(&mut self, name: impl Into<String>, compute: impl Compute<V> + 'static) -> NodeId {
        self.insert(name, NodeKind::Computed(Box::new(compute)))
    }

    fn slot(&self, id: NodeId) -> Result<&NodeSlot<V>, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::UnknownNode(id))
    }

    fn slot_mut(&mut self, id: NodeId) -> Result<&mut NodeSlot<V>, GraphError> {
        self.nodes.get_mut(&id).ok_or(GraphError::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).map(|slot| slot.name.as_str())
    }

    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.nodes.get(&id).map_or(false, |slot| slot.dirty)
    }

    /// Last published result, without updating
    pub fn cached(&self, id: NodeId) -> Option<&Outcome<V>> {
        self.nodes.get(&id).and_then(|slot| slot.cached.as_ref())
    }

    pub fn dependents(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|slot| slot.dependents.as_slice())
            .unwrap_or(&[])
    }

    pub fn upstream(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&id)
            .map(|slot| slot.links.iter().map(|(up, _)| *up).collect())
            .unwrap_or_default()
    }

    /// Opt a node into fail-soft behavior
    ///
    /// A fail-soft node whose computation raises publishes
    /// [`Outcome::Failed`] instead of aborting the update pass.
    pub fn set_fail_soft(&mut self, id: NodeId, fail_soft: bool) -> Result<(), GraphError> {
        self.slot_mut(id)?.fail_soft = fail_soft;
        Ok(())
    }

    /// Replace the value of an input node and invalidate everything below it
    pub fn set_value(&mut self, id: NodeId, value: V) -> Result<(), GraphError> {
        let slot = self.slot_mut(id)?;
        match &mut slot.kind {
            NodeKind::Source(current) => *current = Rc::new(value),
            NodeKind::Computed(_) => return Err(GraphError::NotASource(slot.name.clone())),
        }
        self.mark_dirty(id)
    }

    /// Wire `upstream`'s result into `node` under `slot`
    ///
    /// Rebinding an existing slot replaces the old link. Links that would
    /// close a cycle are rejected and leave the graph unchanged.
    pub fn link_to(&mut self, node: NodeId, upstream: NodeId, slot: impl Into<String>) -> Result<(), GraphError> {
        let slot_name = slot.into();
        self.slot(upstream)?;
        self.slot(node)?;
        if node == upstream || self.depends_on(upstream, node) {
            return Err(GraphError::Cycle {
                node: self.slot(node)?.name.clone(),
                upstream: self.slot(upstream)?.name.clone(),
            });
        }

        let previous = {
            let slot = self.slot_mut(node)?;
            let previous = slot
                .links
                .iter()
                .position(|(_, name)| *name == slot_name)
                .map(|idx| slot.links.remove(idx).0);
            slot.links.push((upstream, slot_name));
            previous
        };
        if let Some(old) = previous {
            self.forget_dependent(old, node);
        }
        let up = self.slot_mut(upstream)?;
        if !up.dependents.contains(&node) {
            up.dependents.push(node);
        }
        self.mark_dirty(node)
    }

    /// Remove every link from `upstream` into `node`
    pub fn unlink(&mut self, node: NodeId, upstream: NodeId) -> Result<(), GraphError> {
        self.slot_mut(node)?.links.retain(|(up, _)| *up != upstream);
        self.forget_dependent(upstream, node);
        self.mark_dirty(node)
    }

    /// Detach a node from both directions and drop it
    ///
    /// Former dependents lose the input and are marked dirty.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        let slot = self.nodes.remove(&id).ok_or(GraphError::UnknownNode(id))?;
        for (up, _) in &slot.links {
            self.forget_dependent(*up, id);
        }
        for dependent in &slot.dependents {
            if let Some(dep) = self.nodes.get_mut(dependent) {
                dep.links.retain(|(up, _)| *up != id);
            }
            self.mark_dirty(*dependent)?;
        }
        tracing::trace!(node = %slot.name, "removed compute node");
        Ok(())
    }

    fn forget_dependent(&mut self, upstream: NodeId, dependent: NodeId) {
        let still_linked = self
            .nodes
            .get(&dependent)
            .map_or(false, |slot| slot.links.iter().any(|(up, _)| *up == upstream));
        if still_linked {
            return;
        }
        if let Some(up) = self.nodes.get_mut(&upstream) {
            up.dependents.retain(|d| *d != dependent);
        }
    }

    /// True if `node` transitively reads from `ancestor`
    fn depends_on(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut stack = vec![node];
        let mut seen = AHashSet::new();
        while let Some(current) = stack.pop() {
            if current == ancestor {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(slot) = self.nodes.get(&current) {
                stack.extend(slot.links.iter().map(|(up, _)| *up));
            }
        }
        false
    }

    /// Invalidate a node and everything downstream of it
    pub fn mark_dirty(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.slot(id)?;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(slot) = self.nodes.get_mut(&current) {
                slot.dirty = true;
                stack.extend(slot.dependents.iter().copied().filter(|d| *d != current));
            }
        }
        Ok(())
    }

    /// Bring a node up to date and return its published result
    ///
    /// A clean node with a cached result returns it untouched. Otherwise
    /// every upstream is updated first, the computation runs once with the
    /// collected inputs, and the result is published. A computation error
    /// aborts the pass unless the node is fail-soft.
    pub fn update(&mut self, id: NodeId) -> Result<Outcome<V>, GraphError> {
        let links = {
            let slot = self.slot(id)?;
            if !slot.dirty {
                if let Some(cached) = &slot.cached {
                    return Ok(cached.clone());
                }
            }
            slot.links.clone()
        };

        let mut collected = Vec::with_capacity(links.len());
        for (upstream, slot_name) in links {
            let outcome = self.update(upstream)?;
            collected.push((slot_name, outcome));
        }
        let inputs = Inputs::new(collected);

        let slot = self.slot_mut(id)?;
        let result = match &mut slot.kind {
            NodeKind::Source(value) => Ok(Rc::clone(value)),
            NodeKind::Computed(compute) => compute.compute(&inputs).map(Rc::new),
        };
        let outcome = match result {
            Ok(value) => Outcome::Ready(value),
            Err(e) if slot.fail_soft => {
                tracing::warn!(node = %slot.name, error = %e, "fail-soft node published a failure");
                Outcome::Failed(Rc::from(e.message()))
            }
            Err(e) => {
                return Err(GraphError::ComputeFailed {
                    node: slot.name.clone(),
                    message: e.message().to_string(),
                })
            }
        };
        tracing::trace!(node = %slot.name, "published");
        slot.cached = Some(outcome.clone());
        slot.dirty = false;

        let dependents = slot.dependents.clone();
        for dependent in dependents {
            self.mark_dirty(dependent)?;
        }
        Ok(outcome)
    }

    /// Update a node and then every node downstream of it
    pub fn propagate(&mut self, id: NodeId) -> Result<(), GraphError> {
        for node in self.downstream_order(id)? {
            self.update(node)?;
        }
        Ok(())
    }

    /// `id` followed by its transitive dependents, upstream before downstream
    fn downstream_order(&self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        self.slot(id)?;
        let mut visited = AHashSet::new();
        let mut order = Vec::new();
        // iterative post-order over dependents
        let mut stack = vec![(id, false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                order.push(current);
                continue;
            }
            if !visited.insert(current) {
                continue;
            }
            stack.push((current, true));
            for dep in self.dependents(current).iter().rev() {
                if !visited.contains(dep) {
                    stack.push((*dep, false));
                }
            }
        }
        order.reverse();
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::{ComputeError, FnNode};
    use std::cell::Cell;

    fn sum_node(counter: Rc<Cell<usize>>) -> FnNode<impl FnMut(&Inputs<i64>) -> Result<i64, ComputeError>> {
        FnNode(move |inputs: &Inputs<i64>| {
            counter.set(counter.get() + 1);
            let mut total = 0;
            for (slot, _) in inputs.iter() {
                total += *inputs.value(slot)?;
            }
            Ok(total)
        })
    }

    #[test]
    fn test_clean_node_is_not_recomputed() {
        let mut graph = ComputeGraph::new();
        let a = graph.add_source("a", 2);
        let calls = Rc::new(Cell::new(0));
        let sum = graph.add_node("sum", sum_node(calls.clone()));
        graph.link_to(sum, a, "a").unwrap();

        assert_eq!(graph.update(sum).unwrap().value(), Some(&2));
        assert_eq!(graph.update(sum).unwrap().value(), Some(&2));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_source_change_invalidates_downstream() {
        let mut graph = ComputeGraph::new();
        let a = graph.add_source("a", 2);
        let b = graph.add_source("b", 5);
        let calls = Rc::new(Cell::new(0));
        let sum = graph.add_node("sum", sum_node(calls.clone()));
        graph.link_to(sum, a, "a").unwrap();
        graph.link_to(sum, b, "b").unwrap();
        assert_eq!(graph.update(sum).unwrap().value(), Some(&7));

        graph.set_value(a, 10).unwrap();
        assert!(graph.is_dirty(sum));
        assert_eq!(graph.update(sum).unwrap().value(), Some(&15));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_link_rejects_cycle() {
        let mut graph: ComputeGraph<i64> = ComputeGraph::new();
        let x = graph.add_node("x", sum_node(Rc::new(Cell::new(0))));
        let y = graph.add_node("y", sum_node(Rc::new(Cell::new(0))));
        graph.link_to(y, x, "x").unwrap();
        assert!(matches!(graph.link_to(x, y, "y"), Err(GraphError::Cycle { .. })));
        assert!(matches!(graph.link_to(x, x, "self"), Err(GraphError::Cycle { .. })));
        assert!(graph.upstream(x).is_empty());
    }

    #[test]
    fn test_rebinding_slot_replaces_link() {
        let mut graph = ComputeGraph::new();
        let a = graph.add_source("a", 1);
        let b = graph.add_source("b", 100);
        let sum = graph.add_node("sum", sum_node(Rc::new(Cell::new(0))));
        graph.link_to(sum, a, "in").unwrap();
        graph.link_to(sum, b, "in").unwrap();

        assert_eq!(graph.update(sum).unwrap().value(), Some(&100));
        assert!(graph.dependents(a).is_empty());
        assert_eq!(graph.dependents(b), &[sum]);
    }

    #[test]
    fn test_fatal_failure_aborts_update() {
        let mut graph: ComputeGraph<i64> = ComputeGraph::new();
        let bad = graph.add_node(
            "bad",
            FnNode(|_: &Inputs<i64>| -> Result<i64, ComputeError> { Err(ComputeError::msg("nope")) }),
        );
        let down = graph.add_node("down", sum_node(Rc::new(Cell::new(0))));
        graph.link_to(down, bad, "bad").unwrap();

        let err = graph.update(down).unwrap_err();
        assert_eq!(
            err,
            GraphError::ComputeFailed {
                node: "bad".to_string(),
                message: "nope".to_string()
            }
        );
        assert!(graph.cached(down).is_none());
    }

    #[test]
    fn test_remove_node_dirties_dependents() {
        let mut graph = ComputeGraph::new();
        let a = graph.add_source("a", 4);
        let b = graph.add_source("b", 6);
        let sum = graph.add_node("sum", sum_node(Rc::new(Cell::new(0))));
        graph.link_to(sum, a, "a").unwrap();
        graph.link_to(sum, b, "b").unwrap();
        assert_eq!(graph.update(sum).unwrap().value(), Some(&10));

        graph.remove_node(b).unwrap();
        assert!(!graph.contains(b));
        assert_eq!(graph.update(sum).unwrap().value(), Some(&4));
    }

    #[test]
    fn test_set_value_on_computed_node_is_rejected() {
        let mut graph: ComputeGraph<i64> = ComputeGraph::new();
        let n = graph.add_node("n", sum_node(Rc::new(Cell::new(0))));
        assert_eq!(graph.set_value(n, 1), Err(GraphError::NotASource("n".to_string())));
    }
}
