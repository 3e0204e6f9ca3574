//! Catalog backed by DuckDB: a database file, or a PostgreSQL server attached
//! through DuckDB's `postgres` extension.

use super::{AuditFilter, Catalog, ForeignKeyRef};
use crate::error::{BoxError, Error, Result};
use duckdb::{params, AccessMode, Config, Connection};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Alias of the attached PostgreSQL database
const PG_ALIAS: &str = "pg";

const DUCKDB_TABLES_SQL: &str = "SELECT table_name FROM information_schema.tables \
     WHERE table_catalog = current_database() AND table_schema = ? AND table_type = 'BASE TABLE' \
     ORDER BY table_name";

const DUCKDB_FOREIGN_KEYS_SQL: &str = "SELECT unnest(constraint_column_names), referenced_table, \
     unnest(referenced_column_names) FROM duckdb_constraints() \
     WHERE constraint_type = 'FOREIGN KEY' AND database_name = current_database() \
     AND schema_name = ? AND table_name = ?";

#[derive(Debug, Clone)]
enum Backend {
    File(PathBuf),
    Postgres { target: String },
    Connection,
}

/// Catalog reading `information_schema` through a DuckDB connection
pub struct DuckDbCatalog {
    conn: Connection,
    backend: Backend,
    schema: String,
    filter: AuditFilter,
}

impl DuckDbCatalog {
    /// Open a DuckDB database file read-only
    pub fn open(path: &Path, schema: &str, filter: AuditFilter) -> Result<Self> {
        let connection_error = |e: duckdb::Error| Error::Connection {
            target: format!("DuckDB database {}", path.display()),
            source: e.into(),
        };

        let config = Config::default()
            .access_mode(AccessMode::ReadOnly)
            .map_err(connection_error)?;
        let conn = Connection::open_with_flags(path, config).map_err(connection_error)?;

        info!(path = %path.display(), schema, "opened DuckDB catalog");
        Ok(Self {
            conn,
            backend: Backend::File(path.to_path_buf()),
            schema: schema.to_string(),
            filter,
        })
    }

    /// Wrap an existing connection
    pub fn from_connection(conn: Connection, schema: &str, filter: AuditFilter) -> Self {
        Self {
            conn,
            backend: Backend::Connection,
            schema: schema.to_string(),
            filter,
        }
    }

    /// Attach a PostgreSQL database read-only.
    ///
    /// `dsn` is a libpq connection string; `target` is a password-free label
    /// used in messages.
    pub fn connect_postgres(
        dsn: &str,
        target: &str,
        schema: &str,
        filter: AuditFilter,
    ) -> Result<Self> {
        let connection_error = |e: duckdb::Error| Error::Connection {
            target: format!("PostgreSQL {}", target),
            source: e.into(),
        };

        let conn = Connection::open_in_memory().map_err(connection_error)?;
        conn.execute_batch("INSTALL postgres; LOAD postgres;")
            .map_err(connection_error)?;
        conn.execute_batch(&format!(
            "ATTACH {} AS {} (TYPE postgres, READ_ONLY)",
            quote_literal(dsn),
            PG_ALIAS
        ))
        .map_err(connection_error)?;

        info!(postgres = target, schema, "attached PostgreSQL catalog");
        Ok(Self {
            conn,
            backend: Backend::Postgres {
                target: target.to_string(),
            },
            schema: schema.to_string(),
            filter,
        })
    }

    fn query_tables(&self) -> std::result::Result<Vec<String>, duckdb::Error> {
        match self.backend {
            Backend::Postgres { .. } => {
                let remote = format!(
                    "SELECT table_name FROM information_schema.tables \
                     WHERE table_schema = {} AND table_type = 'BASE TABLE' ORDER BY table_name",
                    quote_literal(&self.schema)
                );
                let mut stmt = self.conn.prepare(&postgres_query(&remote))?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                rows.collect()
            }
            _ => {
                let mut stmt = self.conn.prepare(DUCKDB_TABLES_SQL)?;
                let rows = stmt.query_map(params![self.schema], |row| row.get::<_, String>(0))?;
                rows.collect()
            }
        }
    }
}

impl Catalog for DuckDbCatalog {
    fn list_tables(&self) -> Result<Vec<String>> {
        let tables = self.query_tables().map_err(|e| Error::ListTables {
            schema: self.schema.clone(),
            source: e.into(),
        })?;
        debug!(count = tables.len(), "listed tables");
        Ok(self.filter.apply(tables))
    }

    fn foreign_keys_of(&self, table: &str) -> Result<Vec<ForeignKeyRef>, BoxError> {
        let map_row = |row: &duckdb::Row<'_>| -> duckdb::Result<ForeignKeyRef> {
            Ok(ForeignKeyRef {
                local_column: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                referenced_table: row.get::<_, String>(1)?,
                referenced_column: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        };

        let fks = match self.backend {
            Backend::Postgres { .. } => {
                // pg_constraint is keyed by table oid; constraint names are only
                // unique per table
                let remote = format!(
                    "SELECT a.attname::text, \
                     CASE WHEN fn.nspname = n.nspname THEN ft.relname::text \
                          ELSE fn.nspname::text || '.' || ft.relname::text END, \
                     fa.attname::text \
                     FROM pg_catalog.pg_constraint c \
                     JOIN pg_catalog.pg_class t ON t.oid = c.conrelid \
                     JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace \
                     JOIN pg_catalog.pg_class ft ON ft.oid = c.confrelid \
                     JOIN pg_catalog.pg_namespace fn ON fn.oid = ft.relnamespace \
                     CROSS JOIN LATERAL unnest(c.conkey, c.confkey) WITH ORDINALITY AS k(attnum, fattnum, ord) \
                     JOIN pg_catalog.pg_attribute a ON a.attrelid = c.conrelid AND a.attnum = k.attnum \
                     JOIN pg_catalog.pg_attribute fa ON fa.attrelid = c.confrelid AND fa.attnum = k.fattnum \
                     WHERE c.contype = 'f' AND n.nspname = {} AND t.relname = {} \
                     ORDER BY c.conname, k.ord",
                    quote_literal(&self.schema),
                    quote_literal(table)
                );
                let mut stmt = self.conn.prepare(&postgres_query(&remote))?;
                let rows = stmt.query_map([], map_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            _ => {
                let mut stmt = self.conn.prepare(DUCKDB_FOREIGN_KEYS_SQL)?;
                let rows = stmt.query_map(params![self.schema, table], map_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        Ok(fks)
    }

    fn describe(&self) -> String {
        match &self.backend {
            Backend::File(path) => {
                format!("DuckDB database {} (schema {})", path.display(), self.schema)
            }
            Backend::Postgres { target } => {
                format!("PostgreSQL {} (schema {})", target, self.schema)
            }
            Backend::Connection => format!("DuckDB connection (schema {})", self.schema),
        }
    }

    fn schema(&self) -> Option<&str> {
        Some(&self.schema)
    }
}

/// Quote a SQL string literal
fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Wrap a query so it runs on the attached PostgreSQL server
fn postgres_query(remote_sql: &str) -> String {
    format!(
        "SELECT * FROM postgres_query({}, {})",
        quote_literal(PG_ALIAS),
        quote_literal(remote_sql)
    )
}
