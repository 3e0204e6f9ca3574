mod cycles;
mod source;
mod tables;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use schema_cycles::graph::{Layout, LayoutEngine, OutputFormat};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "schema-cycles")]
#[command(author = "Helge Sverre <helge.sverre@gmail.com>")]
#[command(version)]
#[command(about = "Find and draw foreign-key cycles in database schemas", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the schema is read from
#[derive(Args, Debug, Clone)]
#[group(id = "source", required = true, multiple = false)]
pub struct SourceArgs {
    /// SQL dump file (supports .gz, .bz2, .xz, .zst compression)
    #[arg(long, value_name = "FILE")]
    pub dump: Option<PathBuf>,

    /// DuckDB database file, opened read-only
    #[arg(long, value_name = "FILE")]
    pub duckdb: Option<PathBuf>,

    /// PostgreSQL server from the config file's `connection` section
    #[arg(long)]
    pub postgres: bool,
}

/// Options shared by every command that reads a catalog
#[derive(Args, Debug, Clone, Default)]
pub struct CatalogArgs {
    /// Config file (default: <config dir>/schema-cycles/config.yaml if present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Schema to inspect (default: public for PostgreSQL, main for DuckDB)
    #[arg(long)]
    pub schema: Option<String>,

    /// Audit table suffix to exclude; repeatable, replaces the defaults (_aud, _audit)
    #[arg(long = "audit-suffix", value_name = "SUFFIX")]
    pub audit_suffixes: Vec<String>,

    /// Exclude tables matching glob patterns (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Show a spinner while reading the catalog
    #[arg(short, long)]
    pub progress: bool,
}

/// Which graph to output
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// Only tables and edges that are part of a cycle
    #[default]
    Cycles,
    /// Every table and foreign key, with cycles highlighted
    Full,
}

impl View {
    fn as_str(self) -> &'static str {
        match self {
            View::Cycles => "cycles",
            View::Full => "full",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find foreign-key cycles and output the cyclic subgraph
    Cycles {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        catalog: CatalogArgs,

        /// Output format: dot, mermaid, json (default: from --output extension, else dot)
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Output file; .png/.svg/.pdf are rendered with Graphviz (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Graph to output
        #[arg(long, value_enum, default_value_t = View::Cycles)]
        view: View,

        /// Graphviz layout engine for rendered images: sfdp, dot, neato, fdp, circo, twopi
        #[arg(long)]
        engine: Option<LayoutEngine>,

        /// Layout direction: lr, tb
        #[arg(long)]
        layout: Option<Layout>,

        /// Also draw self-referencing edges
        #[arg(long)]
        self_loops: bool,

        /// Print the cycles as text instead of a graph
        #[arg(long)]
        list: bool,

        /// Output results as JSON (same as --format json)
        #[arg(long)]
        json: bool,
    },

    /// List the tables the catalog discovers (audit tables excluded)
    Tables {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        catalog: CatalogArgs,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the JSON schema of --json output
    Schema {
        /// Command whose output schema to print: cycles, tables (default: all)
        #[arg(long)]
        command: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Cycles {
            source,
            catalog,
            format,
            output,
            view,
            engine,
            layout,
            self_loops,
            list,
            json,
        } => cycles::run(cycles::CyclesOptions {
            source,
            catalog,
            format: if json { Some(OutputFormat::Json) } else { format },
            output,
            view,
            engine,
            layout,
            self_loops,
            list,
        }),
        Commands::Tables {
            source,
            catalog,
            json,
        } => tables::run(source, catalog, json),
        Commands::Schema { command } => print_schema(command.as_deref()),
        Commands::Completions { shell } => {
            generate(
                shell,
                &mut Cli::command(),
                "schema-cycles",
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}

fn print_schema(command: Option<&str>) -> anyhow::Result<()> {
    use schema_cycles::json_schema;

    let output = match command {
        Some(name) => {
            let schema = json_schema::get_schema(name).ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown command: {}. Valid options: {}",
                    name,
                    json_schema::schema_names().join(", ")
                )
            })?;
            serde_json::to_string_pretty(&schema)?
        }
        None => serde_json::to_string_pretty(&json_schema::all_schemas())?,
    };

    println!("{}", output);
    Ok(())
}
