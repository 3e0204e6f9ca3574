//! Find foreign-key cycles in relational database schemas.
//!
//! The pipeline reads a schema [`catalog`], builds the full and
//! self-reference-free foreign-key graphs, reduces them to the subgraph made
//! of every simple cycle, and renders the result.
//!
//! ```ignore
//! use schema_cycles::catalog::{AuditFilter, DumpCatalog};
//! use schema_cycles::graph::{build_from_catalog, extract_cycles};
//! use std::path::Path;
//!
//! let catalog = DumpCatalog::open(Path::new("schema.sql"), AuditFilter::default(), None)?;
//! let graphs = build_from_catalog(&catalog)?;
//! let cycles = extract_cycles(&graphs.dag);
//! println!("{} tables take part in a cycle", cycles.node_count());
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod graph;
pub mod json_schema;

pub use error::{Error, Result};
