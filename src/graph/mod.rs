//! Foreign-key graph construction, cycle extraction and rendering.
//!
//! This module provides:
//! - Full and self-reference-free graphs built from catalog data
//! - Enumeration of every simple cycle (Johnson's algorithm)
//! - Reduction to the cyclic subgraph, plus self-reference reporting
//! - A cheap cyclicity check using Tarjan's SCC algorithm
//! - Output formats: DOT (Graphviz), Mermaid, JSON, rendered images

pub mod builder;
pub mod cycles;
pub mod format;
pub mod render;
mod scc;
mod table_graph;

pub use builder::{
    build, build_from_catalog, catalog_edges, BuildStats, DagCandidateGraph, FullGraph,
    SchemaGraphs,
};
pub use cycles::{extract_cycles, self_references, simple_cycles, Cycle, CycleGraph};
pub use format::{to_dot, to_json, to_mermaid, DotOptions, Layout, OutputFormat};
pub use render::{render_image, LayoutEngine};
pub use scc::{cyclic_components, is_cyclic};
pub use table_graph::TableGraph;
