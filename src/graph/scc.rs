//! Strongly connected components (Tarjan's algorithm).
//!
//! Used in two places: as the decomposition step of simple-cycle enumeration,
//! and as a fast "does this schema have any cycle at all" check that avoids
//! enumerating every cycle.

use crate::graph::TableGraph;

/// Tarjan's SCC over an index-based adjacency list, restricted to the nodes
/// accepted by `include`.
pub(crate) struct Tarjan<'a, F> {
    adjacency: &'a [Vec<usize>],
    include: F,
    index_counter: usize,
    stack: Vec<usize>,
    on_stack: Vec<bool>,
    indices: Vec<Option<usize>>,
    lowlinks: Vec<usize>,
    sccs: Vec<Vec<usize>>,
}

impl<'a, F> Tarjan<'a, F>
where
    F: Fn(usize) -> bool,
{
    pub(crate) fn new(adjacency: &'a [Vec<usize>], include: F) -> Self {
        let n = adjacency.len();
        Self {
            adjacency,
            include,
            index_counter: 0,
            stack: Vec::new(),
            on_stack: vec![false; n],
            indices: vec![None; n],
            lowlinks: vec![0; n],
            sccs: Vec::new(),
        }
    }

    /// Run the search and return every component (singletons included).
    pub(crate) fn run(mut self) -> Vec<Vec<usize>> {
        for node in 0..self.adjacency.len() {
            if (self.include)(node) && self.indices[node].is_none() {
                self.strongconnect(node);
            }
        }
        self.sccs
    }

    fn strongconnect(&mut self, v: usize) {
        self.indices[v] = Some(self.index_counter);
        self.lowlinks[v] = self.index_counter;
        self.index_counter += 1;
        self.stack.push(v);
        self.on_stack[v] = true;

        let adjacency = self.adjacency;
        for &w in &adjacency[v] {
            if !(self.include)(w) {
                continue;
            }
            match self.indices[w] {
                None => {
                    self.strongconnect(w);
                    self.lowlinks[v] = self.lowlinks[v].min(self.lowlinks[w]);
                }
                Some(w_index) if self.on_stack[w] => {
                    self.lowlinks[v] = self.lowlinks[v].min(w_index);
                }
                Some(_) => {}
            }
        }

        if Some(self.lowlinks[v]) == self.indices[v] {
            let mut scc = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack[w] = false;
                scc.push(w);
                if w == v {
                    break;
                }
            }
            self.sccs.push(scc);
        }
    }
}

/// Components that contain a cycle: more than one table, or a single table
/// referencing itself. Each component is sorted by name; components are
/// sorted by their first table.
pub fn cyclic_components(graph: &TableGraph) -> Vec<Vec<String>> {
    let adjacency = graph.adjacency();
    let mut components: Vec<Vec<String>> = Tarjan::new(adjacency, |_| true)
        .run()
        .into_iter()
        .filter(|scc| scc.len() > 1 || adjacency[scc[0]].contains(&scc[0]))
        .map(|scc| {
            let mut names: Vec<String> = scc
                .into_iter()
                .map(|idx| graph.node_name(idx).to_string())
                .collect();
            names.sort();
            names
        })
        .collect();
    components.sort();
    components
}

/// Whether the graph contains at least one cycle, without enumerating them.
pub fn is_cyclic(graph: &TableGraph) -> bool {
    let adjacency = graph.adjacency();
    Tarjan::new(adjacency, |_| true)
        .run()
        .iter()
        .any(|scc| scc.len() > 1 || adjacency[scc[0]].contains(&scc[0]))
}
