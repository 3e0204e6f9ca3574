//! Mermaid flowchart format output.

use crate::graph::format::Layout;
use crate::graph::TableGraph;
use ahash::{AHashMap, AHashSet};

/// Words that flowchart syntax reserves, compared lowercased
const RESERVED_IDS: &[&str] = &[
    "end",
    "graph",
    "flowchart",
    "subgraph",
    "direction",
    "style",
    "class",
    "classdef",
    "click",
    "linkstyle",
    "default",
];

/// Generate a Mermaid flowchart from a graph
pub fn to_mermaid(graph: &TableGraph, layout: Layout) -> String {
    let mut output = String::new();

    output.push_str(&format!("flowchart {}\n", layout.direction()));

    let ids = assign_ids(graph);
    let id_of = |table: &str| {
        ids.get(table)
            .cloned()
            .unwrap_or_else(|| escape_mermaid_id(table))
    };

    for table in graph.nodes() {
        let id = id_of(table);
        if id == table {
            output.push_str(&format!("    {}\n", id));
        } else {
            output.push_str(&format!("    {}[\"{}\"]\n", id, table.replace('"', "#quot;")));
        }
    }

    if graph.edge_count() > 0 {
        output.push('\n');
    }

    for (from, to) in graph.edges() {
        output.push_str(&format!("    {} --> {}\n", id_of(from), id_of(to)));
    }

    output
}

/// One distinct node ID per table, in node order.
///
/// Names that sanitize to the same ID get a numeric suffix; reserved words
/// get a trailing underscore.
fn assign_ids(graph: &TableGraph) -> AHashMap<&str, String> {
    let mut ids = AHashMap::new();
    let mut used: AHashSet<String> = AHashSet::new();

    for table in graph.nodes() {
        let mut base = escape_mermaid_id(table);
        if base.is_empty() || RESERVED_IDS.contains(&base.to_lowercase().as_str()) {
            base.push('_');
        }

        let mut id = base.clone();
        let mut n = 2;
        while used.contains(&id) {
            id = format!("{}_{}", base, n);
            n += 1;
        }
        used.insert(id.clone());
        ids.insert(table, id);
    }

    ids
}

/// Escape a string for use as a Mermaid node ID
fn escape_mermaid_id(s: &str) -> String {
    // Mermaid IDs should be alphanumeric with underscores
    s.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
