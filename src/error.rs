//! Error types shared by the catalog readers and the graph pipeline.
//!
//! An acyclic schema is not an error: cycle extraction returns an empty
//! graph for it. Only genuine failures (unreadable dumps, failing catalog
//! queries, broken configuration) show up here.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error produced by a catalog backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias using [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Querying the foreign keys of one table failed. The whole build is
    /// abandoned; no partial graph is returned.
    #[error("failed to query foreign keys of table `{table}`")]
    CatalogQuery {
        table: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to list tables in schema `{schema}`")]
    ListTables {
        schema: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to open {target}")]
    Connection {
        target: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl Error {
    /// Name of the table whose catalog query failed, if any.
    pub fn failed_table(&self) -> Option<&str> {
        match self {
            Error::CatalogQuery { table, .. } => Some(table),
            _ => None,
        }
    }
}
