//! Cycles command: build the foreign-key graphs, extract every cycle and
//! write the result.

use super::source::{open_catalog, resolve_settings, spinner};
use super::{CatalogArgs, SourceArgs, View};
use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use schema_cycles::catalog::Catalog;
use schema_cycles::graph::format::{is_image_extension, CycleReport};
use schema_cycles::graph::{
    build, catalog_edges, render_image, self_references, simple_cycles, to_dot, to_json,
    to_mermaid, Cycle, CycleGraph, DotOptions, Layout, LayoutEngine, OutputFormat, SchemaGraphs,
    TableGraph,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Parsed command-line options of `cycles`
pub struct CyclesOptions {
    pub source: SourceArgs,
    pub catalog: CatalogArgs,
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
    pub view: View,
    pub engine: Option<LayoutEngine>,
    pub layout: Option<Layout>,
    pub self_loops: bool,
    pub list: bool,
}

pub fn run(opts: CyclesOptions) -> Result<()> {
    let settings = resolve_settings(&opts.catalog, opts.engine, opts.layout)?;

    let format = opts.format.unwrap_or_else(|| {
        opts.output
            .as_deref()
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .and_then(OutputFormat::from_extension)
            .unwrap_or_default()
    });
    let quiet = format == OutputFormat::Json && !opts.list;

    let catalog = open_catalog(&opts.source, &settings)?;
    if !quiet {
        eprintln!("Reading schema: {}", catalog.describe());
    }

    let pb = spinner(opts.catalog.progress, "Listing tables");
    let graphs = build_graphs(catalog.as_ref(), &pb)?;

    let cycles = simple_cycles(&graphs.dag);
    let self_refs = self_references(&graphs.full);
    let cycle_graph = CycleGraph::from_cycles(&cycles);
    info!(
        tables = graphs.stats.tables,
        edges = graphs.stats.edges,
        cycles = cycles.len(),
        cyclic_tables = cycle_graph.node_count(),
        "cycle extraction complete"
    );

    if opts.list {
        print_cycle_list(&cycles, &self_refs);
        print_summary(&graphs, &cycles, &self_refs);
        return Ok(());
    }

    let (graph, highlight) = select_view(opts.view, opts.self_loops, &graphs, &cycle_graph);

    let title = format!("Foreign-key {} - {}", opts.view.as_str(), catalog.describe());
    let content = match format {
        OutputFormat::Dot => to_dot(
            &graph,
            DotOptions {
                layout: settings.layout,
                highlight: highlight.as_ref(),
                title: Some(title.as_str()),
            },
        ),
        OutputFormat::Mermaid => to_mermaid(&graph, settings.layout),
        OutputFormat::Json => to_json(&CycleReport::new(
            opts.view.as_str(),
            &graph,
            &cycles,
            &self_refs,
            &graphs.stats,
        )),
    };

    match &opts.output {
        Some(path) if has_image_extension(path) => {
            if format != OutputFormat::Dot {
                bail!(
                    "cannot render {} output to an image; use --format dot or a .{} file",
                    format,
                    format.extension()
                );
            }
            render_image(&content, path, settings.engine)?;
            eprintln!("Rendered to: {}", path.display());
        }
        Some(path) => {
            fs::write(path, content.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            if !quiet {
                eprintln!("Graph written to: {}", path.display());
            }
        }
        None => println!("{}", content),
    }

    if !quiet {
        print_summary(&graphs, &cycles, &self_refs);
    }

    Ok(())
}

/// Graph to output, and the cycle overlay to highlight in it
fn select_view(
    view: View,
    self_loops: bool,
    graphs: &SchemaGraphs,
    cycle_graph: &CycleGraph,
) -> (TableGraph, Option<TableGraph>) {
    let cyclic = if self_loops {
        cycle_graph.with_self_loops(&graphs.full)
    } else {
        (**cycle_graph).clone()
    };

    match view {
        View::Cycles => (cyclic, None),
        View::Full => {
            let graph = if self_loops {
                (*graphs.full).clone()
            } else {
                (*graphs.dag).clone()
            };
            (graph, Some(cyclic))
        }
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(is_image_extension)
        .unwrap_or(false)
}

fn print_cycle_list(cycles: &[Cycle], self_refs: &[String]) {
    for cycle in cycles {
        println!("{}", cycle.display());
    }
    for table in self_refs {
        let cycle = Cycle {
            tables: vec![table.clone()],
        };
        println!("{}", cycle.display());
    }
}

/// Build both graphs, reporting progress on `pb`. The spinner is cleared
/// whether or not the catalog fails.
fn build_graphs(catalog: &dyn Catalog, pb: &ProgressBar) -> Result<SchemaGraphs> {
    let graphs = catalog
        .list_tables()
        .and_then(|tables| {
            build(&tables, |table| {
                pb.set_message(format!("Querying foreign keys of {}", table));
                catalog_edges(catalog, table)
            })
        });
    pb.finish_and_clear();
    Ok(graphs?)
}

fn print_summary(graphs: &SchemaGraphs, cycles: &[Cycle], self_refs: &[String]) {
    if cycles.is_empty() {
        eprintln!("\nNo cycles detected.");
    } else {
        let cyclic_tables = CycleGraph::from_cycles(cycles).node_count();
        eprintln!(
            "\nCycles detected: {} across {} tables",
            cycles.len(),
            cyclic_tables
        );
    }

    eprintln!(
        "Schema: {} tables, {} foreign-key edges, {} self-references",
        graphs.stats.tables,
        graphs.stats.edges,
        self_refs.len()
    );
    if graphs.stats.dropped_edges > 0 {
        eprintln!(
            "Skipped {} edges to tables outside the graph (audit, excluded or other schema)",
            graphs.stats.dropped_edges
        );
    }
}
