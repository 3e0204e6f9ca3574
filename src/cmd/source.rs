//! Settings resolution and catalog opening shared by the commands.

use super::{CatalogArgs, SourceArgs};
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use schema_cycles::catalog::{Catalog, DuckDbCatalog, DumpCatalog};
use schema_cycles::config::{FileConfig, Overrides, Settings};
use schema_cycles::graph::{Layout, LayoutEngine};
use std::time::Duration;
use tracing::info;

const DUCKDB_DEFAULT_SCHEMA: &str = "main";
const POSTGRES_DEFAULT_SCHEMA: &str = "public";

/// Merge the config file with command-line flags
pub fn resolve_settings(
    args: &CatalogArgs,
    engine: Option<LayoutEngine>,
    layout: Option<Layout>,
) -> Result<Settings> {
    let file = FileConfig::discover(args.config.as_deref())?;
    let overrides = Overrides {
        schema: args.schema.clone(),
        audit_suffixes: args.audit_suffixes.clone(),
        exclude: args
            .exclude
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        engine,
        layout,
    };
    Ok(Settings::resolve(file, overrides))
}

/// Open the catalog selected on the command line
pub fn open_catalog(source: &SourceArgs, settings: &Settings) -> Result<Box<dyn Catalog>> {
    let filter = settings.audit_filter();

    let catalog: Box<dyn Catalog> = if let Some(path) = &source.dump {
        if !path.exists() {
            bail!("input file does not exist: {}", path.display());
        }
        Box::new(DumpCatalog::open(path, filter, settings.schema.as_deref())?)
    } else if let Some(path) = &source.duckdb {
        if !path.exists() {
            bail!("database file does not exist: {}", path.display());
        }
        Box::new(DuckDbCatalog::open(
            path,
            settings.schema_or(DUCKDB_DEFAULT_SCHEMA),
            filter,
        )?)
    } else if source.postgres {
        let connection = &settings.connection;
        Box::new(
            DuckDbCatalog::connect_postgres(
                &connection.dsn(),
                &connection.target(),
                settings.schema_or(POSTGRES_DEFAULT_SCHEMA),
                filter,
            )
            .context("check the `connection` section of your config file")?,
        )
    } else {
        bail!("no schema source given; use --dump, --duckdb or --postgres");
    };

    info!(catalog = %catalog.describe(), "catalog ready");
    Ok(catalog)
}

/// Spinner on stderr, hidden unless `enabled`
pub fn spinner(enabled: bool, message: &str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
