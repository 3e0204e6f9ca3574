//! JSON format output for cycle reports and table listings.

use crate::graph::{BuildStats, Cycle, TableGraph};
use ahash::AHashSet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// JSON representation of a cycle analysis run
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CycleReport {
    /// Which graph the `tables`/`edges` lists describe: `cycles` or `full`
    pub view: String,
    pub tables: Vec<String>,
    pub edges: Vec<EdgeJson>,
    /// Every simple cycle, each starting at its alphabetically first table
    pub cycles: Vec<Vec<String>>,
    /// Tables with a foreign key to themselves
    pub self_references: Vec<String>,
    pub stats: ReportStats,
}

/// JSON representation of a foreign-key edge
#[derive(Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct EdgeJson {
    pub from: String,
    pub to: String,
}

/// Report statistics
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ReportStats {
    pub catalog_table_count: usize,
    pub table_count: usize,
    pub edge_count: usize,
    pub cycle_count: usize,
    pub cyclic_table_count: usize,
    pub self_reference_count: usize,
    pub dropped_edge_count: usize,
}

impl CycleReport {
    /// Build the report for the graph being output
    pub fn new(
        view: &str,
        graph: &TableGraph,
        cycles: &[Cycle],
        self_references: &[String],
        build: &BuildStats,
    ) -> Self {
        let cyclic_tables: AHashSet<&str> = cycles
            .iter()
            .flat_map(|c| c.tables.iter().map(String::as_str))
            .collect();

        Self {
            view: view.to_string(),
            tables: graph.nodes().map(str::to_string).collect(),
            edges: graph
                .edges()
                .map(|(from, to)| EdgeJson {
                    from: from.to_string(),
                    to: to.to_string(),
                })
                .collect(),
            cycles: cycles.iter().map(|c| c.tables.clone()).collect(),
            self_references: self_references.to_vec(),
            stats: ReportStats {
                catalog_table_count: build.tables,
                table_count: graph.node_count(),
                edge_count: graph.edge_count(),
                cycle_count: cycles.len(),
                cyclic_table_count: cyclic_tables.len(),
                self_reference_count: self_references.len(),
                dropped_edge_count: build.dropped_edges,
            },
        }
    }
}

/// JSON output of the `tables` command
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TableListJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub tables: Vec<String>,
    pub count: usize,
}

/// Serialize a cycle report as pretty JSON
pub fn to_json(report: &CycleReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
}
