//! Graph construction from catalog data.
//!
//! Two graphs come out of a build:
//! - [`FullGraph`]: every discovered table and every foreign-key edge,
//!   self-references included
//! - [`DagCandidateGraph`]: the same nodes with self-referencing edges removed,
//!   which is what cycle enumeration runs over

use crate::catalog::Catalog;
use crate::error::{BoxError, Error, Result};
use crate::graph::TableGraph;
use ahash::AHashSet;
use std::ops::Deref;
use tracing::debug;

/// All tables and all foreign-key edges, including self-edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FullGraph(TableGraph);

/// All tables and every foreign-key edge whose source differs from its target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DagCandidateGraph(TableGraph);

impl DagCandidateGraph {
    /// Build a candidate graph straight from edges, skipping self-references.
    pub fn from_edges<'a, I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut graph = TableGraph::new();
        for (source, target) in edges {
            if source == target {
                graph.add_node(source);
            } else {
                graph.add_edge(source, target);
            }
        }
        Self(graph)
    }
}

impl Deref for FullGraph {
    type Target = TableGraph;

    fn deref(&self) -> &TableGraph {
        &self.0
    }
}

impl Deref for DagCandidateGraph {
    type Target = TableGraph;

    fn deref(&self) -> &TableGraph {
        &self.0
    }
}

/// Counters collected while building
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Distinct tables discovered by the catalog
    pub tables: usize,
    /// Raw edges reported by the edge source (before deduplication)
    pub foreign_keys: usize,
    /// Distinct edges in the full graph
    pub edges: usize,
    /// Tables referencing themselves
    pub self_references: usize,
    /// Edges dropped because an endpoint was not a discovered table
    pub dropped_edges: usize,
}

/// Result of a successful build
#[derive(Debug, Clone)]
pub struct SchemaGraphs {
    pub full: FullGraph,
    pub dag: DagCandidateGraph,
    pub stats: BuildStats,
}

/// Build the full and candidate graphs.
///
/// Every table becomes a node of both graphs, isolated or not. `edge_source`
/// is asked once per distinct table for its outgoing `(source, target)`
/// edges. If it fails, the build fails with [`Error::CatalogQuery`] naming
/// that table and nothing built so far is returned.
///
/// An edge whose source or target is not among `tables` is dropped and
/// counted in [`BuildStats::dropped_edges`]: a table excluded by the audit
/// filter, or living in another schema, never becomes a node.
pub fn build<S, F>(tables: &[S], mut edge_source: F) -> Result<SchemaGraphs>
where
    S: AsRef<str>,
    F: FnMut(&str) -> Result<Vec<(String, String)>, BoxError>,
{
    let mut full = TableGraph::new();
    let mut dag = TableGraph::new();

    for table in tables {
        full.add_node(table.as_ref());
        dag.add_node(table.as_ref());
    }

    let mut stats = BuildStats {
        tables: full.node_count(),
        ..BuildStats::default()
    };

    let mut queried: AHashSet<&str> = AHashSet::new();
    for table in tables {
        let table = table.as_ref();
        if !queried.insert(table) {
            continue;
        }

        let edges = edge_source(table).map_err(|source| Error::CatalogQuery {
            table: table.to_string(),
            source,
        })?;
        debug!(table, edges = edges.len(), "queried foreign keys");

        for (source, target) in edges {
            stats.foreign_keys += 1;

            if !full.contains_node(&source) || !full.contains_node(&target) {
                debug!(%source, %target, "dropping edge to undiscovered table");
                stats.dropped_edges += 1;
                continue;
            }

            full.add_edge(&source, &target);
            if source != target {
                dag.add_edge(&source, &target);
            }
        }
    }

    stats.edges = full.edge_count();
    stats.self_references = full.self_loops().count();

    Ok(SchemaGraphs {
        full: FullGraph(full),
        dag: DagCandidateGraph(dag),
        stats,
    })
}

/// List the catalog's tables and build both graphs from its foreign keys.
pub fn build_from_catalog<C>(catalog: &C) -> Result<SchemaGraphs>
where
    C: Catalog + ?Sized,
{
    let tables = catalog.list_tables()?;
    build(&tables, |table| catalog_edges(catalog, table))
}

/// Resolve a table's foreign keys to `(table, referenced_table)` edges.
pub fn catalog_edges<C>(catalog: &C, table: &str) -> Result<Vec<(String, String)>, BoxError>
where
    C: Catalog + ?Sized,
{
    Ok(catalog
        .foreign_keys_of(table)?
        .into_iter()
        .map(|fk| (table.to_string(), fk.referenced_table))
        .collect())
}
