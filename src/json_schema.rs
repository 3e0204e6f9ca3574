//! JSON Schema generation for CLI output types.
//!
//! Schemas are generated using the schemars crate and can be exported via the
//! `schema` subcommand.

use schemars::{schema_for, Schema};
use std::collections::BTreeMap;

/// Returns all JSON schemas for commands that support --json output.
/// Uses BTreeMap for deterministic ordering.
pub fn all_schemas() -> BTreeMap<&'static str, Schema> {
    let mut schemas = BTreeMap::new();

    // cycles command
    schemas.insert("cycles", schema_for!(crate::graph::format::CycleReport));

    // tables command
    schemas.insert("tables", schema_for!(crate::graph::format::TableListJson));

    schemas
}

/// Generate a single schema by command name.
pub fn get_schema(command: &str) -> Option<Schema> {
    all_schemas().remove(command)
}

/// List all available schema names.
pub fn schema_names() -> Vec<&'static str> {
    all_schemas().keys().copied().collect()
}
