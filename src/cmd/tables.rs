use super::source::{open_catalog, resolve_settings, spinner};
use super::{CatalogArgs, SourceArgs};
use anyhow::Result;
use schema_cycles::graph::format::TableListJson;

pub fn run(source: SourceArgs, catalog_args: CatalogArgs, json: bool) -> Result<()> {
    let settings = resolve_settings(&catalog_args, None, None)?;
    let catalog = open_catalog(&source, &settings)?;

    let pb = spinner(catalog_args.progress, "Listing tables");
    let tables = catalog.list_tables();
    pb.finish_and_clear();
    let tables = tables?;

    if json {
        let output = TableListJson {
            schema: catalog.schema().map(str::to_string),
            count: tables.len(),
            tables,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for table in &tables {
        println!("{}", table);
    }
    eprintln!("\n{} tables in {}", tables.len(), catalog.describe());

    Ok(())
}
