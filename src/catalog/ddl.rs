//! DDL parsing for foreign-key extraction.
//!
//! Parses CREATE TABLE and ALTER TABLE statements to extract:
//! - Table names, with their schema qualifier when present
//! - Table-level `FOREIGN KEY (..) REFERENCES ..` constraints
//! - Inline column `REFERENCES ..` clauses
//!
//! Quoting styles of MySQL (`` ` ``), PostgreSQL (`"`), and MSSQL (`[]`) are
//! accepted.

use super::ForeignKeyRef;
use once_cell::sync::Lazy;
use regex::Regex;

/// Regex to extract the (optionally schema-qualified) table name from CREATE TABLE
static CREATE_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(?:(?:GLOBAL|LOCAL)\s+)?(?:TEMP(?:ORARY)?\s+|UNLOGGED\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(?:[\[`"]?([\w$]+)[\]`"]?\s*\.\s*)?[\[`"]?([^\[\]`"\s(.;]+)[\]`"]?"#,
    )
    .expect("valid regex")
});

/// Regex to extract the (optionally schema-qualified) table name from ALTER TABLE
static ALTER_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)^\s*ALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(?:ONLY\s+)?(?:[\[`"]?([\w$]+)[\]`"]?\s*\.\s*)?[\[`"]?([^\[\]`"\s(.;]+)[\]`"]?"#,
    )
    .expect("valid regex")
});

/// Regex for FOREIGN KEY constraint; referenced columns are optional.
/// Of a multi-part qualifier only the part nearest the table is captured.
static FOREIGN_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)FOREIGN\s+KEY\s*\(([^)]+)\)\s*REFERENCES\s+(?:[\[`"]?([\w$]+)[\]`"]?\s*\.\s*)*[\[`"]?([^\[\]`"\s(,;.]+)[\]`"]?(?:\s*\(([^)]+)\))?"#,
    )
    .expect("valid regex")
});

/// Regex for an inline `REFERENCES table (col)` clause on a column definition
static INLINE_REFERENCES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\bREFERENCES\s+(?:[\[`"]?([\w$]+)[\]`"]?\s*\.\s*)*[\[`"]?([^\[\]`"\s(,;.]+)[\]`"]?(?:\s*\(([^)]+)\))?"#,
    )
    .expect("valid regex")
});

/// Regex for table-level constraint and index definitions
static CONSTRAINT_START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:CONSTRAINT|FOREIGN\s+KEY|PRIMARY\s+KEY|UNIQUE|KEY|INDEX|CHECK|FULLTEXT|SPATIAL|EXCLUDE)\b",
    )
    .expect("valid regex")
});

/// Regex for the leading column name of a column definition
static COLUMN_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*[\[`"]?([^\[\]`"\s,]+)[\]`"]?"#).expect("valid regex"));

/// Regex for `ADD [COLUMN] name ...` clauses of ALTER TABLE
static ADD_COLUMN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^\s*ADD\s+(?:COLUMN\s+)?(?:IF\s+NOT\s+EXISTS\s+)?"#).expect("valid regex")
});

/// Table name with its optional schema qualifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub schema: Option<String>,
    pub name: String,
}

/// A foreign key as written, keeping the referenced table's qualifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredForeignKey {
    pub referenced_schema: Option<String>,
    pub key: ForeignKeyRef,
}

/// Foreign keys declared by one DDL statement
#[derive(Debug, Clone)]
pub struct TableDdl {
    pub table: QualifiedName,
    pub foreign_keys: Vec<DeclaredForeignKey>,
}

/// Statement kinds relevant to FK extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    CreateTable,
    AlterTable,
    Other,
}

/// Classify a statement by its leading keywords
pub fn classify(stmt: &str) -> StatementKind {
    let upper: String = stmt
        .trim_start()
        .chars()
        .take(64)
        .collect::<String>()
        .to_uppercase();

    if upper.starts_with("ALTER TABLE") {
        StatementKind::AlterTable
    } else if upper.starts_with("CREATE") && CREATE_TABLE_RE.is_match(stmt) {
        StatementKind::CreateTable
    } else {
        StatementKind::Other
    }
}

/// Parse a CREATE TABLE statement.
///
/// `backslash_escapes` makes `\` escape a quote in every string literal, as
/// in MySQL; otherwise only `E'...'` literals honour it.
pub fn parse_create_table(stmt: &str, backslash_escapes: bool) -> Option<TableDdl> {
    let table = capture_name(&CREATE_TABLE_RE, stmt)?;

    let mut foreign_keys = Vec::new();
    if let Some(body) = extract_table_body(stmt, backslash_escapes) {
        for part in split_top_level(&body, backslash_escapes) {
            foreign_keys.extend(parse_definition(&part));
        }
    }

    Some(TableDdl {
        table,
        foreign_keys,
    })
}

/// Parse an ALTER TABLE statement for added foreign keys
pub fn parse_alter_table(stmt: &str, backslash_escapes: bool) -> Option<TableDdl> {
    let table = capture_name(&ALTER_TABLE_RE, stmt)?;
    let rest = ALTER_TABLE_RE
        .find(stmt)
        .map(|m| &stmt[m.end()..])
        .unwrap_or_default();

    let mut foreign_keys = Vec::new();
    for action in split_top_level(rest, backslash_escapes) {
        let Some(add) = ADD_COLUMN_RE.find(&action) else {
            continue;
        };
        let definition = &action[add.end()..];
        foreign_keys.extend(parse_definition(definition));
    }

    Some(TableDdl {
        table,
        foreign_keys,
    })
}

fn capture_name(re: &Regex, stmt: &str) -> Option<QualifiedName> {
    let caps = re.captures(stmt)?;
    Some(QualifiedName {
        schema: caps.get(1).map(|m| m.as_str().to_string()),
        name: caps.get(2)?.as_str().to_string(),
    })
}

/// Parse one column definition or table constraint
fn parse_definition(def: &str) -> Vec<DeclaredForeignKey> {
    let trimmed = def.trim();

    if CONSTRAINT_START_RE.is_match(trimmed) {
        return parse_foreign_key_constraints(trimmed);
    }

    let Some(column) = COLUMN_NAME_RE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
    else {
        return Vec::new();
    };

    INLINE_REFERENCES_RE
        .captures(trimmed)
        .map(|caps| {
            let referenced_table = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            let referenced_column = caps
                .get(3)
                .and_then(|m| parse_column_list(m.as_str()).into_iter().next())
                .unwrap_or_default();
            vec![DeclaredForeignKey {
                referenced_schema: caps.get(1).map(|m| m.as_str().to_string()),
                key: ForeignKeyRef::new(column, referenced_table, referenced_column),
            }]
        })
        .unwrap_or_default()
}

/// Parse FOREIGN KEY constraints, one [`ForeignKeyRef`] per column pair
fn parse_foreign_key_constraints(stmt: &str) -> Vec<DeclaredForeignKey> {
    let mut fks = Vec::new();

    for caps in FOREIGN_KEY_RE.captures_iter(stmt) {
        let local_cols = caps
            .get(1)
            .map(|m| parse_column_list(m.as_str()))
            .unwrap_or_default();
        let ref_schema = caps.get(2).map(|m| m.as_str().to_string());
        let Some(ref_table) = caps.get(3).map(|m| m.as_str()) else {
            continue;
        };
        let ref_cols = caps
            .get(4)
            .map(|m| parse_column_list(m.as_str()))
            .unwrap_or_default();

        for (i, local) in local_cols.iter().enumerate() {
            let referenced_column = ref_cols.get(i).cloned().unwrap_or_default();
            fks.push(DeclaredForeignKey {
                referenced_schema: ref_schema.clone(),
                key: ForeignKeyRef::new(local.clone(), ref_table, referenced_column),
            });
        }
    }

    fks
}

/// Extract the body of a CREATE TABLE statement (between first ( and matching ))
fn extract_table_body(stmt: &str, backslash_escapes: bool) -> Option<String> {
    let bytes = stmt.as_bytes();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escapes = false;
    let mut escape_next = false;

    for (i, &b) in bytes.iter().enumerate() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if b == b'\\' && in_string && escapes {
            escape_next = true;
            continue;
        }
        if b == b'\'' {
            if !in_string {
                escapes = backslash_escapes || opens_escape_string(&bytes[..i]);
            }
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }

        if b == b'(' {
            if depth == 0 {
                start = Some(i + 1);
            }
            depth += 1;
        } else if b == b')' && depth > 0 {
            depth -= 1;
            if depth == 0 {
                if let Some(s) = start {
                    return Some(stmt[s..i].to_string());
                }
            }
        }
    }

    None
}

/// Split by commas, respecting nested parentheses and string literals
fn split_top_level(body: &str, backslash_escapes: bool) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escapes = false;
    let mut escape_next = false;

    for ch in body.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }
        if ch == '\\' && in_string && escapes {
            current.push(ch);
            escape_next = true;
            continue;
        }
        if ch == '\'' {
            if !in_string {
                escapes = backslash_escapes || opens_escape_string(current.as_bytes());
            }
            in_string = !in_string;
            current.push(ch);
            continue;
        }
        if in_string {
            current.push(ch);
            continue;
        }

        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }

    parts
}

/// Bytes that may continue an identifier or a dollar-quote tag
pub(super) fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Whether a quote following `before` opens a PostgreSQL `E'...'` literal
pub(super) fn opens_escape_string(before: &[u8]) -> bool {
    match before {
        [.., prev, b'E' | b'e'] => !is_identifier_byte(*prev),
        [b'E' | b'e'] => true,
        _ => false,
    }
}

/// Parse a comma-separated column list, stripping quotes (backticks, double quotes, brackets)
fn parse_column_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|c| {
            c.trim()
                .trim_matches('`')
                .trim_matches('"')
                .trim_matches('[')
                .trim_matches(']')
                .to_string()
        })
        .filter(|c| !c.is_empty())
        .collect()
}
