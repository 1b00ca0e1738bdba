//! Command-line front end for docrag.
//!
//! The corpus lives for one process: `query` ingests its sources and then
//! answers from them.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use docrag_retrieval::{RagConfig, RagEngine, RetrievedContext};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "docrag",
    version,
    about = "Chunk, embed and search documents with exact cosine retrieval"
)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest files or directories and report what was stored
    Ingest {
        /// Files or directories (non-recursive)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Ingest sources, then print the context retrieved for a question
    Query {
        /// Files or directories to search
        #[arg(short, long = "source", required = true)]
        sources: Vec<PathBuf>,

        /// Number of fragments to retrieve (defaults to the configured top-k)
        #[arg(short)]
        k: Option<usize>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// The question to answer
        question: String,
    },
}

/// Install the global tracing subscriber. `RUST_LOG` takes precedence.
pub fn init_logging(default_level: &str, verbose: bool) {
    let filter = if verbose { "debug" } else { default_level };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = RagConfig::load(cli.config.as_deref()).context("loading configuration")?;
    init_logging(&config.log_level, cli.verbose);

    let engine = RagEngine::new(config)?;
    let health = engine.health();
    info!("{} {} ({})", health.app_name, health.version, health.status);

    match cli.command {
        Command::Ingest { paths } => {
            let failed = ingest_all(&engine, &paths).await?;
            let stats = engine.stats().await;
            println!(
                "Stored {} fragments (dimension {}) using {}/{}",
                stats.fragments,
                stats
                    .dimension
                    .map_or_else(|| "-".to_string(), |d| format!("{d}")),
                stats.provider,
                stats.model
            );
            if failed > 0 {
                bail!("{failed} sources failed to ingest");
            }
        }
        Command::Query {
            sources,
            k,
            json,
            question,
        } => {
            ingest_all(&engine, &sources).await?;

            let k = k.unwrap_or(engine.config().query.top_k);
            let retrieved = engine.retrieve_context(&question, k).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&retrieved)?);
            } else {
                print!("{}", render_context(&retrieved));
            }
        }
    }

    Ok(())
}

/// Ingest every path, printing one line per source. Returns the number of
/// sources that failed.
async fn ingest_all(engine: &RagEngine, paths: &[PathBuf]) -> Result<usize> {
    let mut failed = 0;

    for path in paths {
        let report = engine
            .ingest_path(path)
            .await
            .with_context(|| format!("ingesting {}", path.display()))?;

        for source in &report.sources {
            println!("{:>6}  {}", source.fragments, source.source_id);
        }
        for failure in &report.failures {
            eprintln!("failed  {}: {}", failure.path.display(), failure.error);
        }
        failed += report.failures.len();
    }

    Ok(failed)
}

/// Human-readable rendering of a retrieval result.
pub fn render_context(retrieved: &RetrievedContext) -> String {
    if retrieved.is_empty() {
        return "No matching fragments.\n".to_string();
    }

    let mut out = String::new();
    out.push_str(&retrieved.context);
    out.push_str("\n\nSources:\n");
    for source in &retrieved.sources {
        out.push_str("  - ");
        out.push_str(source);
        out.push('\n');
    }
    out
}
