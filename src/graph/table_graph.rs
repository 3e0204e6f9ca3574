//! Directed graph of tables connected by foreign-key edges.

use ahash::{AHashMap, AHashSet};
use std::collections::BTreeSet;

/// A directed graph whose nodes are table names.
///
/// Nodes keep the order in which they were first added (catalog discovery
/// order), which is what renderers use for display. Edges are identified by
/// their `(source, target)` pair: adding the same pair twice is a no-op, so
/// several FK columns between two tables collapse into one edge.
///
/// Equality is structural set equality over nodes and edges; insertion order
/// does not participate.
#[derive(Debug, Clone, Default)]
pub struct TableGraph {
    nodes: Vec<String>,
    index: AHashMap<String, usize>,
    edges: Vec<(usize, usize)>,
    edge_set: AHashSet<(usize, usize)>,
    successors: Vec<Vec<usize>>,
}

impl TableGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its index. Existing nodes keep their index.
    pub fn add_node(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(name.to_string());
        self.index.insert(name.to_string(), idx);
        self.successors.push(Vec::new());
        idx
    }

    /// Add an edge, creating missing endpoints. Returns `true` if the edge is new.
    pub fn add_edge(&mut self, source: &str, target: &str) -> bool {
        let from = self.add_node(source);
        let to = self.add_node(target);
        self.add_edge_by_index(from, to)
    }

    pub(crate) fn add_edge_by_index(&mut self, from: usize, to: usize) -> bool {
        if !self.edge_set.insert((from, to)) {
            return false;
        }
        self.edges.push((from, to));
        self.successors[from].push(to);
        true
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// A graph with no nodes (and therefore no edges)
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn contains_edge(&self, source: &str, target: &str) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(&from), Some(&to)) => self.edge_set.contains(&(from, to)),
            _ => false,
        }
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    /// Edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges
            .iter()
            .map(|&(from, to)| (self.nodes[from].as_str(), self.nodes[to].as_str()))
    }

    /// Tables with an edge pointing back at themselves
    pub fn self_loops(&self) -> impl Iterator<Item = &str> {
        self.edges
            .iter()
            .filter(|(from, to)| from == to)
            .map(|&(from, _)| self.nodes[from].as_str())
    }

    /// Node names as an ordered set, for order-independent comparison
    pub fn node_set(&self) -> BTreeSet<&str> {
        self.nodes().collect()
    }

    /// Edges as an ordered set, for order-independent comparison
    pub fn edge_set(&self) -> BTreeSet<(&str, &str)> {
        self.edges().collect()
    }

    pub(crate) fn node_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub(crate) fn node_name(&self, idx: usize) -> &str {
        &self.nodes[idx]
    }

    pub(crate) fn adjacency(&self) -> &[Vec<usize>] {
        &self.successors
    }
}

impl PartialEq for TableGraph {
    fn eq(&self, other: &Self) -> bool {
        self.node_count() == other.node_count()
            && self.edge_count() == other.edge_count()
            && self.node_set() == other.node_set()
            && self.edge_set() == other.edge_set()
    }
}

impl Eq for TableGraph {}
