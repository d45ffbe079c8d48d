//! Command-line entry point: parse files or directories and print the
//! resulting entity and relationship streams as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codegraph::{ParseRequest, ParserCore, Settings};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "codegraph", version, about = "Incremental code knowledge graph extractor")]
struct Cli {
    /// Repository root (defaults to the current directory).
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Configuration file.
    #[arg(long, global = true, default_value = "codegraph.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse files and/or directories and emit the graph as JSON.
    Parse {
        /// Files or directories to scan.
        paths: Vec<PathBuf>,

        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,

        /// Print scan statistics to stderr.
        #[arg(long)]
        stats: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load_from(&cli.config).context("failed to load configuration")?;
    codegraph::logging::init_with_config(&settings.logging);

    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("cannot determine working directory")?,
    };

    match cli.command {
        Command::Parse {
            paths,
            pretty,
            stats,
        } => {
            let mut core = ParserCore::new(root, settings);
            let mut request = ParseRequest {
                incremental: true,
                ..Default::default()
            };
            for path in paths {
                let display = path.to_string_lossy().to_string();
                if path.is_dir() {
                    request.directories.push(display);
                } else {
                    request.files.push(display);
                }
            }
            let outcome = core.parse(request);

            if stats {
                eprintln!(
                    "entities: {}, relationships: {}, errors: {}",
                    outcome.entities.len(),
                    outcome.relationships.len(),
                    outcome.errors.len()
                );
                eprintln!("budget: {:?}", core.budget_stats());
                eprintln!("cache: {:?}", core.cache_stats());
            }

            let json = if pretty {
                serde_json::to_string_pretty(&outcome)?
            } else {
                serde_json::to_string(&outcome)?
            };
            println!("{json}");
        }
    }
    Ok(())
}
