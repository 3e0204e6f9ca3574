//! Catalog backed by the DDL of a SQL dump file.

use super::ddl::{self, is_identifier_byte, QualifiedName, StatementKind, TableDdl};
use super::{AuditFilter, Catalog, Compression, ForeignKeyRef};
use crate::error::{BoxError, Error, Result};
use ahash::{AHashMap, AHashSet};
use std::io::{self, BufRead};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    SingleQuote,
    DoubleQuote,
    Backtick,
    /// Inside the opening `$tag$` delimiter of a dollar-quoted body
    DollarTag,
    DollarQuote,
    LineComment,
    BlockComment,
}

/// Splits a SQL stream into statements, dropping comments.
///
/// Semicolons inside quotes, dollar-quoted bodies (`$$`, `$tag$`) and comments
/// do not terminate a statement. Data blocks of `COPY ... FROM stdin` are
/// skipped.
///
/// String literals follow standard SQL: a backslash is an ordinary character
/// except inside `E'...'`. Once the stream shows MySQL traits (backtick
/// quoting, `/*!` version comments, `SET sql_mode`) backslashes escape in
/// every literal.
pub struct StatementReader<R: BufRead> {
    reader: R,
    stmt_buffer: Vec<u8>,
    skip_copy_data: bool,
    backslash_escapes: bool,
}

impl<R: BufRead> StatementReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            stmt_buffer: Vec::with_capacity(8 * 1024),
            skip_copy_data: false,
            backslash_escapes: false,
        }
    }

    /// Whether the dump has been recognised as MySQL-flavoured so far
    pub fn backslash_escapes(&self) -> bool {
        self.backslash_escapes
    }

    /// Read the next non-empty statement, without its terminating `;`
    pub fn read_statement(&mut self) -> io::Result<Option<String>> {
        loop {
            if self.skip_copy_data {
                self.skip_copy_block()?;
                self.skip_copy_data = false;
            }

            let Some(stmt) = self.scan_statement()? else {
                return Ok(None);
            };
            let stmt = stmt.trim();
            if stmt.is_empty() {
                continue;
            }

            self.skip_copy_data = is_copy_from_stdin(stmt);
            if is_set_sql_mode(stmt) {
                self.backslash_escapes = true;
            }
            return Ok(Some(stmt.to_string()));
        }
    }

    fn scan_statement(&mut self) -> io::Result<Option<String>> {
        self.stmt_buffer.clear();

        let mut state = ScanState::Normal;
        // whether the open literal honours backslash escapes
        let mut escapes = false;
        let mut escaped = false;
        let mut prev: u8 = 0;
        // delimiter of the open dollar-quoted body and how much of it the body
        // has matched so far
        let mut tag: Vec<u8> = Vec::new();
        let mut matched = 0usize;

        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                if self.stmt_buffer.is_empty() {
                    return Ok(None);
                }
                let result = std::mem::take(&mut self.stmt_buffer);
                return Ok(Some(String::from_utf8_lossy(&result).into_owned()));
            }

            let mut consumed = buf.len();
            let mut found_terminator = false;

            'bytes: for (i, &b) in buf.iter().enumerate() {
                // a byte that turns out not to belong to a `$tag$` is scanned
                // again as normal text
                loop {
                    match state {
                        ScanState::Normal => match b {
                            b'-' if prev == b'-' => {
                                self.stmt_buffer.pop();
                                state = ScanState::LineComment;
                                prev = 0;
                                continue 'bytes;
                            }
                            b'*' if prev == b'/' => {
                                self.stmt_buffer.pop();
                                state = ScanState::BlockComment;
                                prev = 0;
                                continue 'bytes;
                            }
                            b'$' if !is_identifier_byte(prev) => {
                                tag.clear();
                                tag.push(b);
                                state = ScanState::DollarTag;
                            }
                            b'\'' => {
                                escapes = self.backslash_escapes
                                    || ddl::opens_escape_string(&self.stmt_buffer);
                                state = ScanState::SingleQuote;
                            }
                            b'"' => {
                                // MySQL double-quoted strings; identifiers never escape
                                escapes = self.backslash_escapes;
                                state = ScanState::DoubleQuote;
                            }
                            b'`' => {
                                self.backslash_escapes = true;
                                state = ScanState::Backtick;
                            }
                            b';' => {
                                consumed = i + 1;
                                found_terminator = true;
                                break 'bytes;
                            }
                            _ => {}
                        },
                        ScanState::DollarTag => {
                            if b == b'$' {
                                tag.push(b);
                                matched = 0;
                                state = ScanState::DollarQuote;
                            } else if is_identifier_byte(b) && !(tag.len() == 1 && b.is_ascii_digit()) {
                                tag.push(b);
                            } else {
                                // `$1` and friends are parameters, not quotes
                                state = ScanState::Normal;
                                continue;
                            }
                        }
                        ScanState::SingleQuote | ScanState::DoubleQuote => {
                            let quote = if state == ScanState::SingleQuote {
                                b'\''
                            } else {
                                b'"'
                            };
                            if escaped {
                                escaped = false;
                            } else if b == b'\\' && escapes {
                                escaped = true;
                            } else if b == quote {
                                state = ScanState::Normal;
                                self.stmt_buffer.push(b);
                                prev = 0;
                                continue 'bytes;
                            }
                        }
                        ScanState::Backtick => {
                            if b == b'`' {
                                state = ScanState::Normal;
                                self.stmt_buffer.push(b);
                                prev = 0;
                                continue 'bytes;
                            }
                        }
                        ScanState::DollarQuote => {
                            if tag.get(matched) == Some(&b) {
                                matched += 1;
                            } else {
                                matched = usize::from(b == b'$');
                            }
                            if matched == tag.len() {
                                state = ScanState::Normal;
                                self.stmt_buffer.push(b);
                                prev = 0;
                                continue 'bytes;
                            }
                        }
                        ScanState::LineComment => {
                            if b == b'\n' {
                                state = ScanState::Normal;
                                self.stmt_buffer.push(b'\n');
                            }
                            prev = 0;
                            continue 'bytes;
                        }
                        ScanState::BlockComment => {
                            if b == b'!' && prev == 0 {
                                self.backslash_escapes = true;
                            }
                            if b == b'/' && prev == b'*' {
                                state = ScanState::Normal;
                                self.stmt_buffer.push(b' ');
                                prev = 0;
                            } else {
                                prev = b;
                            }
                            continue 'bytes;
                        }
                    }
                    break;
                }

                self.stmt_buffer.push(b);
                prev = b;
            }

            self.reader.consume(consumed);

            if found_terminator {
                let result = std::mem::take(&mut self.stmt_buffer);
                return Ok(Some(String::from_utf8_lossy(&result).into_owned()));
            }
        }
    }

    /// Skip raw COPY rows up to and including the `\.` terminator line
    fn skip_copy_block(&mut self) -> io::Result<()> {
        let mut line = Vec::new();
        loop {
            line.clear();
            if self.reader.read_until(b'\n', &mut line)? == 0 {
                return Ok(());
            }
            if line.trim_ascii() == b"\\." {
                return Ok(());
            }
        }
    }
}

fn is_set_sql_mode(stmt: &str) -> bool {
    let upper = stmt.trim_start().to_uppercase();
    upper.starts_with("SET ") && upper.contains("SQL_MODE")
}

fn is_copy_from_stdin(stmt: &str) -> bool {
    let upper = stmt.to_uppercase();
    upper.starts_with("COPY ") && upper.trim_end().ends_with("FROM STDIN")
}

/// Tables and foreign keys declared in a SQL dump.
///
/// The dump is scanned once at open time; only CREATE TABLE and ALTER TABLE
/// statements are kept. Referenced table names are resolved
/// case-insensitively against the declared tables of the same schema. A
/// reference into a schema that was not loaded keeps its qualified name, so
/// it never matches a node of the graph.
#[derive(Debug)]
pub struct DumpCatalog {
    source: String,
    schema: Option<String>,
    tables: Vec<String>,
    foreign_keys: AHashMap<String, Vec<ForeignKeyRef>>,
    filter: AuditFilter,
}

/// Lowercased `(schema, name)` of a declared table
type TableKey = (Option<String>, String);

fn table_key(schema: Option<&str>, name: &str) -> TableKey {
    (schema.map(str::to_lowercase), name.to_lowercase())
}

/// Maps declared tables to the names the catalog reports for them
#[derive(Debug, Default)]
struct TableNames {
    shown: AHashMap<TableKey, String>,
    by_name: AHashMap<String, Vec<TableKey>>,
    /// Lowercased schemas that qualify at least one declared table
    schemas: AHashSet<String>,
}

impl TableNames {
    /// Register declared tables in order, returning the reported names.
    ///
    /// A bare name shared by tables of several schemas is reported
    /// schema-qualified.
    fn register(&mut self, declared: &[(TableKey, QualifiedName)]) -> Vec<String> {
        for (key, _) in declared {
            self.by_name.entry(key.1.clone()).or_default().push(key.clone());
            if let Some(schema) = &key.0 {
                self.schemas.insert(schema.clone());
            }
        }

        let mut tables = Vec::with_capacity(declared.len());
        for (key, table) in declared {
            let shared = self.by_name.get(&key.1).map_or(0, Vec::len) > 1;
            let shown = match &table.schema {
                Some(schema) if shared => format!("{}.{}", schema, table.name),
                _ => table.name.clone(),
            };
            self.shown.insert(key.clone(), shown.clone());
            tables.push(shown);
        }
        tables
    }

    /// Reported name of the table `schema.name` as seen from a table of
    /// schema `context`.
    ///
    /// A qualified name falls back to an unqualified declaration only when no
    /// declared table is qualified with that schema.
    fn resolve(&self, context: Option<&str>, schema: Option<&str>, name: &str) -> String {
        let found = match schema {
            Some(schema) => self
                .shown
                .get(&table_key(Some(schema), name))
                .or_else(|| {
                    if self.schemas.contains(&schema.to_lowercase()) {
                        None
                    } else {
                        self.shown.get(&table_key(None, name))
                    }
                }),
            None => self
                .shown
                .get(&table_key(context, name))
                .or_else(|| self.shown.get(&table_key(None, name)))
                .or_else(|| self.unique(name)),
        };

        match (found, schema) {
            (Some(shown), _) => shown.clone(),
            (None, Some(schema)) => format!("{}.{}", schema, name),
            (None, None) => name.to_string(),
        }
    }

    fn unique(&self, name: &str) -> Option<&String> {
        match self.by_name.get(&name.to_lowercase())?.as_slice() {
            [only] => self.shown.get(only),
            _ => None,
        }
    }
}

impl DumpCatalog {
    /// Open and scan a dump file, decompressing by extension.
    ///
    /// With `schema` set, schema-qualified tables of other schemas are
    /// skipped and unqualified tables are taken to belong to `schema`.
    pub fn open(path: &Path, filter: AuditFilter, schema: Option<&str>) -> Result<Self> {
        let io_err = |source| Error::Io {
            path: path.to_path_buf(),
            source,
        };

        let compression = Compression::from_path(path);
        info!(path = %path.display(), compression = %compression, "scanning dump");

        let reader = Compression::open(path).map_err(io_err)?;
        let mut catalog = Self::from_reader(reader, filter, schema).map_err(io_err)?;
        catalog.source = path.display().to_string();
        Ok(catalog)
    }

    /// Scan DDL from any buffered reader
    pub fn from_reader<R: BufRead>(
        reader: R,
        filter: AuditFilter,
        schema: Option<&str>,
    ) -> io::Result<Self> {
        let mut statements = StatementReader::new(reader);
        let mut declared: Vec<TableDdl> = Vec::new();
        let mut altered: Vec<TableDdl> = Vec::new();
        let mut count = 0usize;

        while let Some(stmt) = statements.read_statement()? {
            count += 1;
            let parsed = match ddl::classify(&stmt) {
                StatementKind::CreateTable => {
                    ddl::parse_create_table(&stmt, statements.backslash_escapes()).map(|d| (d, true))
                }
                StatementKind::AlterTable => {
                    ddl::parse_alter_table(&stmt, statements.backslash_escapes()).map(|d| (d, false))
                }
                StatementKind::Other => None,
            };
            let Some((table_ddl, is_create)) = parsed else {
                continue;
            };

            if let (Some(wanted), Some(actual)) = (schema, table_ddl.table.schema.as_deref()) {
                if !wanted.eq_ignore_ascii_case(actual) {
                    debug!(table = %table_ddl.table.name, schema = actual, "skipping table outside schema");
                    continue;
                }
            }

            if is_create {
                declared.push(table_ddl);
            } else {
                altered.push(table_ddl);
            }
        }

        // unqualified tables live in the filtered schema, if any
        let home = |table: &QualifiedName| table.schema.clone().or_else(|| schema.map(str::to_string));

        let mut keys: AHashSet<TableKey> = AHashSet::new();
        let mut distinct: Vec<(TableKey, QualifiedName)> = Vec::with_capacity(declared.len());
        for d in &declared {
            let key = table_key(home(&d.table).as_deref(), &d.table.name);
            if keys.insert(key.clone()) {
                distinct.push((key, d.table.clone()));
            }
        }

        let mut names = TableNames::default();
        let tables = names.register(&distinct);

        let mut foreign_keys: AHashMap<String, Vec<ForeignKeyRef>> = AHashMap::new();
        for d in declared.into_iter().chain(altered) {
            let context = home(&d.table);
            let owner = names.resolve(None, context.as_deref(), &d.table.name);
            let entry = foreign_keys.entry(owner).or_default();
            for fk in d.foreign_keys {
                let mut key = fk.key;
                key.referenced_table = names.resolve(
                    context.as_deref(),
                    fk.referenced_schema.as_deref(),
                    &key.referenced_table,
                );
                if !entry.contains(&key) {
                    entry.push(key);
                }
            }
        }

        debug!(
            statements = count,
            tables = tables.len(),
            "dump scan complete"
        );

        Ok(Self {
            source: "SQL input".to_string(),
            schema: schema.map(str::to_string),
            tables,
            foreign_keys,
            filter,
        })
    }
}

impl Catalog for DumpCatalog {
    fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.filter.apply(self.tables.iter().cloned()))
    }

    fn foreign_keys_of(&self, table: &str) -> Result<Vec<ForeignKeyRef>, BoxError> {
        if !self.tables.iter().any(|t| t == table) {
            return Err(format!("table `{}` is not declared in {}", table, self.source).into());
        }
        Ok(self.foreign_keys.get(table).cloned().unwrap_or_default())
    }

    fn describe(&self) -> String {
        match &self.schema {
            Some(schema) => format!("dump {} (schema {})", self.source, schema),
            None => format!("dump {}", self.source),
        }
    }

    fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::TempDir;

    fn statements(sql: &str) -> Vec<String> {
        let mut reader = StatementReader::new(sql.as_bytes());
        let mut out = Vec::new();
        while let Some(stmt) = reader.read_statement().unwrap() {
            out.push(stmt);
        }
        out
    }

    fn catalog(sql: &str, schema: Option<&str>) -> DumpCatalog {
        DumpCatalog::from_reader(sql.as_bytes(), AuditFilter::default(), schema).unwrap()
    }

    #[test]
    fn test_statement_reader_strips_comments() {
        let stmts = statements(
            "-- header; with semicolon\nCREATE TABLE a (id INT); /* block; comment */\nINSERT INTO a VALUES ('x;y', \"q;\");\n",
        );
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], "CREATE TABLE a (id INT)");
        assert!(stmts[1].contains("'x;y'"));
    }

    #[test]
    fn test_statement_reader_escapes_and_dollar_quotes() {
        let stmts = statements(
            "INSERT INTO t VALUES (E'it\\'s; fine');\nCREATE FUNCTION f() RETURNS int AS $$ SELECT 1; $$ LANGUAGE sql;\nSELECT 2",
        );
        assert_eq!(stmts.len(), 3);
        assert!(stmts[1].ends_with("LANGUAGE sql"));
        assert_eq!(stmts[2], "SELECT 2");
    }

    #[test]
    fn test_standard_literals_keep_backslashes() {
        let stmts = statements(
            "INSERT INTO t VALUES ('C:\\');\nCREATE TABLE \"odd\\\" (id INT);\nSELECT 'a''b;c';\nSELECT 2",
        );
        assert_eq!(stmts.len(), 4);
        assert_eq!(stmts[0], "INSERT INTO t VALUES ('C:\\')");
        assert_eq!(stmts[2], "SELECT 'a''b;c'");
    }

    #[test]
    fn test_mysql_dump_enables_backslash_escapes() {
        let sql = "/*!40101 SET NAMES utf8mb4 */;\nINSERT INTO t VALUES ('it\\'s; fine');\nSELECT 2";
        let mut reader = StatementReader::new(sql.as_bytes());
        let mut stmts = Vec::new();
        while let Some(stmt) = reader.read_statement().unwrap() {
            stmts.push(stmt);
        }
        assert!(reader.backslash_escapes());
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[1], "SELECT 2");

        let stmts = statements("SET sql_mode = 'NO_AUTO_VALUE_ON_ZERO';\nSELECT 'x\\';y';\nSELECT 3");
        assert_eq!(stmts.len(), 3);
    }

    #[test]
    fn test_backslash_at_end_of_literal_keeps_following_tables() {
        let cat = catalog(
            "CREATE TABLE a (id INT PRIMARY KEY, p TEXT DEFAULT 'C:\\', b_id INT REFERENCES b(id));
             CREATE TABLE b (id INT PRIMARY KEY, a_id INT REFERENCES a(id), note TEXT DEFAULT 'x');",
            None,
        );

        assert_eq!(cat.list_tables().unwrap(), vec!["a", "b"]);
        let graphs = crate::graph::build_from_catalog(&cat).unwrap();
        assert!(crate::graph::is_cyclic(&graphs.dag));
    }

    #[test]
    fn test_statement_reader_tagged_dollar_quotes() {
        let stmts = statements(
            "CREATE FUNCTION f() RETURNS void AS $_$ BEGIN PERFORM 1; CREATE TEMP TABLE scratch (id INT); RAISE NOTICE '$$'; END; $_$ LANGUAGE plpgsql;\n\
             CREATE FUNCTION g() RETURNS int AS $function$ SELECT $1; $function$ LANGUAGE sql;\n\
             PREPARE p AS SELECT $1;\n\
             CREATE TABLE t (id INT)",
        );
        assert_eq!(stmts.len(), 4);
        assert!(stmts[0].ends_with("LANGUAGE plpgsql"));
        assert!(stmts[1].ends_with("LANGUAGE sql"));
        assert_eq!(stmts[2], "PREPARE p AS SELECT $1");
        assert_eq!(stmts[3], "CREATE TABLE t (id INT)");
    }

    #[test]
    fn test_function_body_tables_are_not_declared() {
        let cat = catalog(
            "CREATE TABLE users (id INT PRIMARY KEY);
             CREATE FUNCTION f() RETURNS void AS $_$
             BEGIN
               PERFORM 1;
               CREATE TEMP TABLE scratch (id INT, user_id INT REFERENCES users(id));
             END;
             $_$ LANGUAGE plpgsql;
             CREATE TABLE orders (id INT, user_id INT REFERENCES users(id));",
            None,
        );

        assert_eq!(cat.list_tables().unwrap(), vec!["users", "orders"]);
    }

    #[test]
    fn test_statement_reader_skips_copy_data() {
        let stmts = statements(
            "COPY public.users (id, name) FROM stdin;\n1\tO'Brien; Ltd\n2\tx\n\\.\nCREATE TABLE b (id INT);\n",
        );
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[1], "CREATE TABLE b (id INT)");
    }

    #[test]
    fn test_dump_catalog_collects_foreign_keys() {
        let cat = catalog(
            "CREATE TABLE Users (id INT PRIMARY KEY, team_id INT);
             CREATE TABLE teams (id INT PRIMARY KEY, owner_id INT REFERENCES users(id));
             CREATE TABLE users_aud (id INT, rev INT);
             ALTER TABLE users ADD CONSTRAINT fk_team FOREIGN KEY (team_id) REFERENCES teams(id);",
            None,
        );

        assert_eq!(cat.list_tables().unwrap(), vec!["Users", "teams"]);
        let users = cat.foreign_keys_of("Users").unwrap();
        assert_eq!(users, vec![ForeignKeyRef::new("team_id", "teams", "id")]);
        let teams = cat.foreign_keys_of("teams").unwrap();
        assert_eq!(teams[0].referenced_table, "Users");
        assert!(cat.foreign_keys_of("ghost").is_err());
    }

    #[test]
    fn test_dump_catalog_schema_filter() {
        let sql = "CREATE TABLE public.a (id INT);
                   CREATE TABLE archive.b (id INT);
                   CREATE TABLE c (id INT);";

        assert_eq!(catalog(sql, Some("public")).list_tables().unwrap(), vec!["a", "c"]);
        assert_eq!(catalog(sql, None).list_tables().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_schema_filter_leaves_foreign_schema_references_unresolved() {
        let sql = "CREATE TABLE public.users (id INT PRIMARY KEY, team_id INT);
                   CREATE TABLE public.teams (id INT PRIMARY KEY, owner_id INT REFERENCES archive.users(id));
                   ALTER TABLE ONLY public.users ADD CONSTRAINT fk_team FOREIGN KEY (team_id) REFERENCES public.teams(id);
                   CREATE TABLE archive.users (id INT PRIMARY KEY);";

        let cat = catalog(sql, Some("public"));
        assert_eq!(cat.list_tables().unwrap(), vec!["users", "teams"]);
        assert_eq!(
            cat.foreign_keys_of("teams").unwrap(),
            vec![ForeignKeyRef::new("owner_id", "archive.users", "id")]
        );
        assert_eq!(
            cat.foreign_keys_of("users").unwrap(),
            vec![ForeignKeyRef::new("team_id", "teams", "id")]
        );

        let graphs = crate::graph::build_from_catalog(&cat).unwrap();
        assert_eq!(graphs.stats.dropped_edges, 1);
        assert!(!crate::graph::is_cyclic(&graphs.dag));
    }

    #[test]
    fn test_same_name_in_two_schemas_stays_apart() {
        let sql = "CREATE TABLE public.users (id INT PRIMARY KEY, team_id INT REFERENCES public.teams(id));
                   CREATE TABLE public.teams (id INT PRIMARY KEY);
                   CREATE TABLE archive.users (id INT PRIMARY KEY, team_id INT REFERENCES teams(id));
                   CREATE TABLE archive.teams (id INT PRIMARY KEY, lead_id INT REFERENCES archive.users(id));";

        let cat = catalog(sql, None);
        assert_eq!(
            cat.list_tables().unwrap(),
            vec!["public.users", "public.teams", "archive.users", "archive.teams"]
        );
        assert_eq!(
            cat.foreign_keys_of("archive.users").unwrap()[0].referenced_table,
            "archive.teams"
        );

        let graphs = crate::graph::build_from_catalog(&cat).unwrap();
        assert_eq!(graphs.full.node_count(), 4);
        assert!(crate::graph::is_cyclic(&graphs.dag));
    }

    #[test]
    fn test_unqualified_tables_belong_to_filtered_schema() {
        let sql = "CREATE TABLE users (id INT PRIMARY KEY);
                   CREATE TABLE orders (id INT, user_id INT REFERENCES public.users(id), legacy_id INT REFERENCES archive.orders(id));";

        let cat = catalog(sql, Some("public"));
        let fks = cat.foreign_keys_of("orders").unwrap();
        assert_eq!(fks[0].referenced_table, "users");
        assert_eq!(fks[1].referenced_table, "archive.orders");
    }

    #[test]
    fn test_qualified_reference_to_unqualified_table() {
        let sql = "CREATE TABLE users (id INT PRIMARY KEY, team_id INT);
                   CREATE TABLE teams (id INT PRIMARY KEY, owner_id INT REFERENCES public.users(id));
                   ALTER TABLE users ADD FOREIGN KEY (team_id) REFERENCES teams(id);";

        let cat = catalog(sql, None);
        assert_eq!(cat.foreign_keys_of("teams").unwrap()[0].referenced_table, "users");

        let graphs = crate::graph::build_from_catalog(&cat).unwrap();
        assert_eq!(graphs.stats.dropped_edges, 0);
        assert!(crate::graph::is_cyclic(&graphs.dag));
    }

    #[test]
    fn test_qualified_alter_on_unqualified_table() {
        let sql = "CREATE TABLE users (id INT PRIMARY KEY, team_id INT);
                   CREATE TABLE teams (id INT PRIMARY KEY, owner_id INT REFERENCES users(id));
                   ALTER TABLE ONLY public.users ADD CONSTRAINT fk_team FOREIGN KEY (team_id) REFERENCES public.teams(id);";

        let cat = catalog(sql, None);
        assert_eq!(cat.list_tables().unwrap(), vec!["users", "teams"]);
        assert_eq!(
            cat.foreign_keys_of("users").unwrap(),
            vec![ForeignKeyRef::new("team_id", "teams", "id")]
        );

        let graphs = crate::graph::build_from_catalog(&cat).unwrap();
        assert!(crate::graph::is_cyclic(&graphs.dag));
    }

    #[test]
    fn test_known_schema_blocks_unqualified_fallback() {
        let sql = "CREATE TABLE users (id INT PRIMARY KEY);
                   CREATE TABLE archive.logs (id INT PRIMARY KEY);
                   CREATE TABLE teams (id INT, owner_id INT REFERENCES archive.users(id));";

        let cat = catalog(sql, None);
        assert_eq!(
            cat.foreign_keys_of("teams").unwrap()[0].referenced_table,
            "archive.users"
        );
    }

    #[test]
    fn test_open_gzip_dump() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schema.sql.gz");

        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(b"CREATE TABLE a (id INT, b_id INT REFERENCES b(id));\nCREATE TABLE b (id INT);\n")
            .unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let cat = DumpCatalog::open(&path, AuditFilter::default(), None).unwrap();
        assert_eq!(cat.list_tables().unwrap(), vec!["a", "b"]);
        assert!(cat.describe().contains("schema.sql.gz"));
    }

    #[test]
    fn test_open_missing_file() {
        let err = DumpCatalog::open(Path::new("/nonexistent/dump.sql"), AuditFilter::default(), None)
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
