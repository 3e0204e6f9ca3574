//! Graphviz DOT format output.

use crate::graph::format::Layout;
use crate::graph::TableGraph;

/// Rendering options for [`to_dot`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DotOptions<'a> {
    /// Layout direction
    pub layout: Layout,
    /// Edges present in this graph are drawn highlighted (cycle overlay on
    /// the full graph)
    pub highlight: Option<&'a TableGraph>,
    /// Graph label
    pub title: Option<&'a str>,
}

/// Generate DOT source with one box per table and one arrow per FK pair
pub fn to_dot(graph: &TableGraph, options: DotOptions<'_>) -> String {
    let mut output = String::new();

    output.push_str("digraph schema {\n");
    output.push_str("  graph [pad=\"0.5\", nodesep=\"0.6\", ranksep=\"1.2\", overlap=false];\n");
    output.push_str(&format!("  rankdir={};\n", options.layout.direction()));
    if let Some(title) = options.title {
        output.push_str(&format!(
            "  label=\"{}\";\n  labelloc=t;\n",
            escape_label(title)
        ));
    }
    output.push_str(
        "  node [shape=box, style=\"rounded,filled\", fillcolor=\"#e2e8f0\", fontname=\"Helvetica\"];\n",
    );
    output.push_str("  edge [color=\"#4a5568\"];\n\n");

    for table in graph.nodes() {
        let in_cycle = options
            .highlight
            .map(|h| h.contains_node(table))
            .unwrap_or(false);
        if in_cycle {
            output.push_str(&format!(
                "  {} [fillcolor=\"#fed7d7\", color=\"#c53030\"];\n",
                escape_dot_id(table)
            ));
        } else {
            output.push_str(&format!("  {};\n", escape_dot_id(table)));
        }
    }

    if graph.edge_count() > 0 {
        output.push('\n');
    }

    for (from, to) in graph.edges() {
        let in_cycle = options
            .highlight
            .map(|h| h.contains_edge(from, to))
            .unwrap_or(false);
        let attrs = if in_cycle {
            " [color=\"#c53030\", penwidth=2]"
        } else {
            ""
        };
        output.push_str(&format!(
            "  {} -> {}{};\n",
            escape_dot_id(from),
            escape_dot_id(to),
            attrs
        ));
    }

    output.push_str("}\n");
    output
}

/// Escape a string for use inside a quoted DOT attribute
fn escape_label(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// DOT keywords, matched case-insensitively by Graphviz
const DOT_KEYWORDS: &[&str] = &["node", "edge", "graph", "digraph", "subgraph", "strict"];

/// Escape a string for use as a DOT node ID
fn escape_dot_id(s: &str) -> String {
    let starts_with_digit = s.chars().next().is_some_and(|c| c.is_ascii_digit());
    let is_keyword = DOT_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(s));
    if !s.is_empty()
        && !starts_with_digit
        && !is_keyword
        && s.chars().all(|c| c.is_alphanumeric() || c == '_')
    {
        s.to_string()
    } else {
        format!("\"{}\"", escape_label(s))
    }
}
