//! Schema catalog readers.
//!
//! A catalog answers two questions about a schema: which tables exist, and
//! which foreign keys each table declares. Implementations:
//! - [`InMemoryCatalog`]: tables and keys held in memory
//! - [`DumpCatalog`]: DDL parsed from a (possibly compressed) SQL dump
//! - [`DuckDbCatalog`]: a DuckDB database file, or a PostgreSQL server
//!   attached through DuckDB's `postgres` extension
//!
//! Audit tables are filtered out by [`AuditFilter`] before they ever reach
//! the graph builder.

mod compression;
pub(crate) mod ddl;
mod dump;
mod database;

pub use compression::Compression;
pub use dump::DumpCatalog;
pub use database::DuckDbCatalog;

use crate::error::{BoxError, Result};
use ahash::AHashMap;
use glob::Pattern;
use tracing::warn;

/// Suffixes that mark audit/history tables by default
pub const DEFAULT_AUDIT_SUFFIXES: &[&str] = &["_aud", "_audit"];

/// One foreign-key column pair declared by a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRef {
    /// FK column in the declaring table
    pub local_column: String,
    /// Table being referenced
    pub referenced_table: String,
    /// Referenced column, usually the primary key
    pub referenced_column: String,
}

impl ForeignKeyRef {
    pub fn new(
        local_column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self {
            local_column: local_column.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
        }
    }
}

/// Read-only access to a schema's tables and foreign keys
pub trait Catalog {
    /// Tables of the schema, audit tables excluded, in discovery order
    fn list_tables(&self) -> Result<Vec<String>>;

    /// Foreign keys declared by `table`
    fn foreign_keys_of(&self, table: &str) -> Result<Vec<ForeignKeyRef>, BoxError>;

    /// Human-readable description of where the catalog reads from
    fn describe(&self) -> String;

    /// Schema the catalog reads, when it is restricted to one
    fn schema(&self) -> Option<&str> {
        None
    }
}

/// Excludes audit tables by name suffix and optional glob patterns.
///
/// Suffixes match case-sensitively.
#[derive(Debug, Clone)]
pub struct AuditFilter {
    suffixes: Vec<String>,
    patterns: Vec<Pattern>,
}

impl Default for AuditFilter {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_SUFFIXES.iter().map(|s| s.to_string()))
    }
}

impl AuditFilter {
    pub fn new<I>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            suffixes: suffixes.into_iter().filter(|s| !s.is_empty()).collect(),
            patterns: Vec::new(),
        }
    }

    /// A filter that lets every table through
    pub fn none() -> Self {
        Self {
            suffixes: Vec::new(),
            patterns: Vec::new(),
        }
    }

    /// Also exclude tables matching any of these glob patterns.
    ///
    /// Invalid patterns are skipped with a warning.
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in patterns {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            match Pattern::new(raw) {
                Ok(p) => self.patterns.push(p),
                Err(e) => warn!(pattern = raw, error = %e, "ignoring invalid exclude pattern"),
            }
        }
        self
    }

    /// Whether `table` should be left out of the graph
    pub fn is_excluded(&self, table: &str) -> bool {
        self.suffixes.iter().any(|s| table.ends_with(s.as_str()))
            || self.patterns.iter().any(|p| p.matches(table))
    }

    /// Keep the tables that pass the filter, preserving order
    pub fn apply(&self, tables: impl IntoIterator<Item = String>) -> Vec<String> {
        tables.into_iter().filter(|t| !self.is_excluded(t)).collect()
    }
}

/// A catalog held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    tables: Vec<String>,
    foreign_keys: AHashMap<String, Vec<ForeignKeyRef>>,
    filter: Option<AuditFilter>,
}

impl InMemoryCatalog {
    pub fn new(filter: AuditFilter) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    pub fn add_table(&mut self, name: &str) {
        if !self.tables.iter().any(|t| t == name) {
            self.tables.push(name.to_string());
        }
    }

    pub fn add_foreign_key(&mut self, table: &str, fk: ForeignKeyRef) {
        self.add_table(table);
        self.foreign_keys
            .entry(table.to_string())
            .or_default()
            .push(fk);
    }
}

impl Catalog for InMemoryCatalog {
    fn list_tables(&self) -> Result<Vec<String>> {
        let tables = self.tables.iter().cloned();
        Ok(match &self.filter {
            Some(filter) => filter.apply(tables),
            None => tables.collect(),
        })
    }

    fn foreign_keys_of(&self, table: &str) -> Result<Vec<ForeignKeyRef>, BoxError> {
        if !self.tables.iter().any(|t| t == table) {
            return Err(format!("unknown table `{}`", table).into());
        }
        Ok(self.foreign_keys.get(table).cloned().unwrap_or_default())
    }

    fn describe(&self) -> String {
        format!("in-memory catalog ({} tables)", self.tables.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_excludes_audit_suffixes() {
        let filter = AuditFilter::default();
        assert!(filter.is_excluded("orders_aud"));
        assert!(filter.is_excluded("orders_audit"));
        assert!(!filter.is_excluded("orders"));
        assert!(!filter.is_excluded("audit_log"));
        assert!(!filter.is_excluded("ORDERS_AUD"));
    }

    #[test]
    fn test_custom_suffixes_and_patterns() {
        let filter = AuditFilter::new(vec!["_history".to_string()]).with_patterns(["tmp_*", "["]);

        assert!(filter.is_excluded("orders_history"));
        assert!(filter.is_excluded("tmp_import"));
        assert!(!filter.is_excluded("orders_aud"));
    }

    #[test]
    fn test_none_filter_keeps_everything() {
        let filter = AuditFilter::none();
        let kept = filter.apply(vec!["a_aud".to_string(), "b".to_string()]);
        assert_eq!(kept, vec!["a_aud", "b"]);
    }

    #[test]
    fn test_in_memory_catalog() {
        let mut catalog = InMemoryCatalog::new(AuditFilter::default());
        catalog.add_table("users");
        catalog.add_foreign_key("orders", ForeignKeyRef::new("user_id", "users", "id"));
        catalog.add_table("users_audit");

        assert_eq!(catalog.list_tables().unwrap(), vec!["users", "orders"]);
        assert_eq!(catalog.foreign_keys_of("orders").unwrap().len(), 1);
        assert!(catalog.foreign_keys_of("users").unwrap().is_empty());
        assert!(catalog.foreign_keys_of("missing").is_err());
    }
}
