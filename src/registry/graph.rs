//! Registration dependency graph
//!
//! Nodes are registration keys plus a synthetic root; an edge `X -> Y` means
//! configuration `X` references `Y` as a child or child variant. Top-level
//! registrations hang off the root until a real parent is found for them.

use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::registry::key::RegistrationKey;

/// Name and namespace of the synthetic root node
pub const ROOT_NAME: &str = "root";

/// Dependency graph over registration keys
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<RegistrationKey, ()>,
    indices: HashMap<RegistrationKey, NodeIndex>,
    /// `variants` node attribute: canonical strings of generated variant keys
    variants: HashMap<RegistrationKey, Vec<String>>,
    root: NodeIndex,
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyGraph {
    /// Graph holding only the root node
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let root_key = Self::root_key();
        let root = graph.add_node(root_key.clone());
        let mut indices = HashMap::new();
        indices.insert(root_key, root);
        Self {
            graph,
            indices,
            variants: HashMap::new(),
            root,
        }
    }

    pub fn root_key() -> RegistrationKey {
        RegistrationKey::new(ROOT_NAME, ROOT_NAME)
    }

    pub fn contains(&self, key: &RegistrationKey) -> bool {
        self.indices.contains_key(key)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn ensure_node(&mut self, key: &RegistrationKey) -> NodeIndex {
        if let Some(index) = self.indices.get(key) {
            return *index;
        }
        let index = self.graph.add_node(key.clone());
        self.indices.insert(key.clone(), index);
        index
    }

    /// Add `key` under the root unless it is already in the graph.
    /// Returns true if the node was added.
    pub fn add_top_level(&mut self, key: &RegistrationKey) -> bool {
        if self.contains(key) {
            return false;
        }
        let index = self.ensure_node(key);
        self.graph.update_edge(self.root, index, ());
        debug!("Added {} to the dependency graph", key);
        true
    }

    /// Add the dependency `parent -> child`, creating missing nodes.
    /// Adding an existing edge is a no-op.
    pub fn add_dependency(&mut self, parent: &RegistrationKey, child: &RegistrationKey) {
        let from = self.ensure_node(parent);
        let to = self.ensure_node(child);
        self.graph.update_edge(from, to, ());
    }

    pub fn has_dependency(&self, parent: &RegistrationKey, child: &RegistrationKey) -> bool {
        match (self.indices.get(parent), self.indices.get(child)) {
            (Some(from), Some(to)) => self.graph.find_edge(*from, *to).is_some(),
            _ => false,
        }
    }

    /// Keys with an edge into `key`
    pub fn parents(&self, key: &RegistrationKey) -> Vec<RegistrationKey> {
        self.neighbors(key, Direction::Incoming)
    }

    /// Keys `key` has an edge to
    pub fn children(&self, key: &RegistrationKey) -> Vec<RegistrationKey> {
        self.neighbors(key, Direction::Outgoing)
    }

    fn neighbors(&self, key: &RegistrationKey, direction: Direction) -> Vec<RegistrationKey> {
        self.indices
            .get(key)
            .map(|index| {
                self.graph
                    .neighbors_directed(*index, direction)
                    .map(|n| self.graph[n].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Set the `variants` attribute of `key`'s node (created if missing)
    pub fn set_variants(&mut self, key: &RegistrationKey, variants: Vec<String>) {
        self.ensure_node(key);
        self.variants.insert(key.clone(), variants);
    }

    pub fn variants(&self, key: &RegistrationKey) -> Option<&[String]> {
        self.variants.get(key).map(Vec::as_slice)
    }

    /// Drop root edges of nodes that also have a real parent
    pub fn prune_root_edges(&mut self) {
        let stale: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|index| *index != self.root)
            .filter(|index| {
                let parents: Vec<NodeIndex> = self
                    .graph
                    .neighbors_directed(*index, Direction::Incoming)
                    .collect();
                parents.len() > 1 && parents.contains(&self.root)
            })
            .collect();

        for index in stale {
            if let Some(edge) = self.graph.find_edge(self.root, index) {
                self.graph.remove_edge(edge);
                debug!("Pruned root edge of {}", self.graph[index]);
            }
        }
    }

    /// Prune stale root edges, then require acyclicity and that every
    /// non-root node has at least one parent.
    pub fn check(&mut self) -> Result<()> {
        self.prune_root_edges();

        if is_cyclic_directed(&self.graph) {
            return Err(Error::NotADag);
        }

        let dangling: Vec<RegistrationKey> = self
            .graph
            .node_indices()
            .filter(|index| *index != self.root)
            .filter(|index| {
                self.graph
                    .neighbors_directed(*index, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|index| self.graph[index].clone())
            .collect();
        if !dangling.is_empty() {
            return Err(Error::DisconnectedGraph(dangling));
        }
        Ok(())
    }

    /// Keys in topological order (parents before children), root first
    pub fn topological_order(&self) -> Result<Vec<RegistrationKey>> {
        let order = toposort(&self.graph, None).map_err(|_| Error::NotADag)?;
        Ok(order.into_iter().map(|index| self.graph[index].clone()).collect())
    }

    /// Reset to the root-only graph
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> RegistrationKey {
        RegistrationKey::new(name, "testing")
    }

    #[test]
    fn test_new_graph_has_only_root() {
        let graph = DependencyGraph::new();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.contains(&DependencyGraph::root_key()));
    }

    #[test]
    fn test_add_top_level_is_idempotent() {
        let mut graph = DependencyGraph::new();
        assert!(graph.add_top_level(&key("a")));
        assert!(!graph.add_top_level(&key("a")));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_duplicate_dependency_is_ignored() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(&key("a"), &key("b"));
        graph.add_dependency(&key("a"), &key("b"));
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.has_dependency(&key("a"), &key("b")));
    }

    #[test]
    fn test_check_prunes_stale_root_edge() {
        let mut graph = DependencyGraph::new();
        graph.add_top_level(&key("child"));
        graph.add_top_level(&key("parent"));
        graph.add_dependency(&key("parent"), &key("child"));

        graph.check().unwrap();
        assert_eq!(graph.parents(&key("child")), vec![key("parent")]);
        assert_eq!(graph.parents(&key("parent")), vec![DependencyGraph::root_key()]);
    }

    #[test]
    fn test_check_detects_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_top_level(&key("a"));
        graph.add_top_level(&key("b"));
        graph.add_dependency(&key("a"), &key("b"));
        graph.add_dependency(&key("b"), &key("a"));

        assert!(matches!(graph.check(), Err(Error::NotADag)));
        assert!(matches!(graph.topological_order(), Err(Error::NotADag)));
    }

    #[test]
    fn test_check_detects_dangling_node() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(&key("orphan"), &key("leaf"));
        match graph.check() {
            Err(Error::DisconnectedGraph(nodes)) => assert_eq!(nodes, vec![key("orphan")]),
            other => panic!("expected disconnected graph, got {:?}", other),
        }
    }

    #[test]
    fn test_topological_order_parents_first() {
        let mut graph = DependencyGraph::new();
        graph.add_top_level(&key("a"));
        graph.add_dependency(&key("a"), &key("b"));
        graph.add_dependency(&key("b"), &key("c"));

        let order = graph.topological_order().unwrap();
        let position = |k: &RegistrationKey| order.iter().position(|o| o == k).unwrap();
        assert_eq!(order[0], DependencyGraph::root_key());
        assert!(position(&key("a")) < position(&key("b")));
        assert!(position(&key("b")) < position(&key("c")));
    }

    #[test]
    fn test_variants_attribute_and_clear() {
        let mut graph = DependencyGraph::new();
        graph.set_variants(&key("a"), vec!["v1".to_string()]);
        assert_eq!(graph.variants(&key("a")), Some(&["v1".to_string()][..]));

        graph.clear();
        assert_eq!(graph.node_count(), 1);
        assert!(graph.variants(&key("a")).is_none());
    }
}
