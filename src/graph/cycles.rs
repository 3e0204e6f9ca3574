//! Simple-cycle enumeration and reduction to the cyclic subgraph.
//!
//! Cycles are enumerated with Johnson's algorithm: for each start node `s`
//! (in index order), find the strongly connected component containing the
//! smallest node of the subgraph induced by `{s, s+1, ..}`, then search it for
//! circuits through `s` with the blocked-set bookkeeping that keeps the search
//! from revisiting dead ends. Worst case is exponential in the number of
//! cycles, which is inherent in reporting every one of them. Use
//! [`is_cyclic`](crate::graph::is_cyclic) when existence is all that matters.

use crate::graph::builder::{DagCandidateGraph, FullGraph};
use crate::graph::scc::Tarjan;
use crate::graph::TableGraph;
use ahash::AHashSet;
use std::fmt;
use std::ops::Deref;

/// A cycle in the graph (list of table names forming the cycle)
///
/// Following the foreign keys from each table to the next, and from the last
/// back to the first, stays inside the candidate graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cycle {
    pub tables: Vec<String>,
}

impl Cycle {
    /// Rotate so the lexicographically smallest table comes first.
    fn normalized(mut tables: Vec<String>) -> Self {
        if let Some(min_pos) = tables
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.cmp(b.1))
            .map(|(i, _)| i)
        {
            tables.rotate_left(min_pos);
        }
        Self { tables }
    }

    /// Check if this is a self-referencing cycle (single table)
    pub fn is_self_reference(&self) -> bool {
        self.tables.len() == 1
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Edges of the cycle including the closing edge back to the first table
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        let n = self.tables.len();
        (0..n).map(move |i| (self.tables[i].as_str(), self.tables[(i + 1) % n].as_str()))
    }

    /// Format the cycle for display
    pub fn display(&self) -> String {
        match self.tables.first() {
            None => String::new(),
            Some(first) if self.is_self_reference() => {
                format!("{} -> {} (self-reference)", first, first)
            }
            Some(first) => {
                let mut parts: Vec<&str> = self.tables.iter().map(String::as_str).collect();
                parts.push(first);
                parts.join(" -> ")
            }
        }
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Union of the nodes and edges of every simple cycle.
///
/// Empty when the schema is acyclic. Always a subgraph of the candidate
/// graph it was extracted from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleGraph(TableGraph);

impl CycleGraph {
    /// Union the edges (closing edge included) of each cycle into one graph.
    pub fn from_cycles(cycles: &[Cycle]) -> Self {
        let mut graph = TableGraph::new();
        for cycle in cycles {
            for (from, to) in cycle.edges() {
                graph.add_edge(from, to);
            }
        }
        Self(graph)
    }

    /// Copy of this graph with the self-referencing edges of `full` added.
    ///
    /// Self-references never reach the candidate graph, so they are absent
    /// from the extracted cycles; this overlays them for display.
    pub fn with_self_loops(&self, full: &FullGraph) -> TableGraph {
        let mut graph = self.0.clone();
        for table in full.self_loops() {
            graph.add_edge(table, table);
        }
        graph
    }
}

impl Deref for CycleGraph {
    type Target = TableGraph;

    fn deref(&self) -> &TableGraph {
        &self.0
    }
}

/// Enumerate every simple cycle of the candidate graph.
///
/// Each cycle starts at its lexicographically smallest table and the list
/// is sorted, so the output is stable across runs.
pub fn simple_cycles(dag: &DagCandidateGraph) -> Vec<Cycle> {
    let graph: &TableGraph = dag;
    let adjacency = graph.adjacency();
    let n = adjacency.len();

    let mut search = CircuitSearch::new(adjacency);
    let mut found: Vec<Vec<usize>> = Vec::new();
    let mut start = 0;

    while start < n {
        let floor = start;
        let component = Tarjan::new(adjacency, |v| v >= floor)
            .run()
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .min_by_key(|scc| scc.iter().copied().min().unwrap_or(usize::MAX));

        let Some(component) = component else {
            break;
        };
        let Some(s) = component.iter().copied().min() else {
            break;
        };

        search.reset(&component, s);
        search.circuit(s, &mut found);
        start = s + 1;
    }

    let mut cycles: Vec<Cycle> = found
        .into_iter()
        .map(|path| {
            Cycle::normalized(
                path.into_iter()
                    .map(|idx| graph.node_name(idx).to_string())
                    .collect(),
            )
        })
        .collect();
    cycles.sort();
    cycles
}

/// Reduce the candidate graph to the edges and nodes lying on some cycle.
///
/// Returns an empty graph for an acyclic input.
pub fn extract_cycles(dag: &DagCandidateGraph) -> CycleGraph {
    CycleGraph::from_cycles(&simple_cycles(dag))
}

/// Tables of the full graph with a foreign key to themselves, in discovery order.
pub fn self_references(full: &FullGraph) -> Vec<String> {
    full.self_loops().map(str::to_string).collect()
}

/// Johnson's circuit search within one strongly connected component.
struct CircuitSearch<'a> {
    adjacency: &'a [Vec<usize>],
    in_component: Vec<bool>,
    blocked: Vec<bool>,
    blocked_by: Vec<AHashSet<usize>>,
    path: Vec<usize>,
    start: usize,
}

impl<'a> CircuitSearch<'a> {
    fn new(adjacency: &'a [Vec<usize>]) -> Self {
        let n = adjacency.len();
        Self {
            adjacency,
            in_component: vec![false; n],
            blocked: vec![false; n],
            blocked_by: vec![AHashSet::new(); n],
            path: Vec::new(),
            start: 0,
        }
    }

    fn reset(&mut self, component: &[usize], start: usize) {
        self.in_component.iter_mut().for_each(|b| *b = false);
        for &v in component {
            self.in_component[v] = true;
            self.blocked[v] = false;
            self.blocked_by[v].clear();
        }
        self.path.clear();
        self.start = start;
    }

    fn circuit(&mut self, v: usize, found: &mut Vec<Vec<usize>>) -> bool {
        let mut closed = false;
        self.path.push(v);
        self.blocked[v] = true;

        let adjacency = self.adjacency;
        for &w in &adjacency[v] {
            if !self.in_component[w] {
                continue;
            }
            if w == self.start {
                found.push(self.path.clone());
                closed = true;
            } else if !self.blocked[w] && self.circuit(w, found) {
                closed = true;
            }
        }

        if closed {
            self.unblock(v);
        } else {
            for &w in &adjacency[v] {
                if self.in_component[w] {
                    self.blocked_by[w].insert(v);
                }
            }
        }

        self.path.pop();
        closed
    }

    fn unblock(&mut self, u: usize) {
        self.blocked[u] = false;
        let waiting = std::mem::take(&mut self.blocked_by[u]);
        for w in waiting {
            if self.blocked[w] {
                self.unblock(w);
            }
        }
    }
}
