use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use semq::engine::Engine;
use semq::index::{Corpus, IndexBuilder, IndexConfig};
use semq::query::{QueryNode, QueryRunner};
use semq::terms::TermsQuery;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "semq")]
#[command(about = "Run semantic search queries over an annotated corpus")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a hit query and print one JSON line per matched document
    Search {
        /// Corpus JSON file
        #[arg(short, long)]
        corpus: PathBuf,

        /// Query JSON file
        #[arg(short, long)]
        query: PathBuf,

        /// Index configuration JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Maximum number of documents to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// Keep nested bindings of compound hits
        #[arg(long)]
        sub_bindings: bool,
    },
    /// Run a terms query and print the result set as JSON
    Terms {
        /// Corpus JSON file
        #[arg(short, long)]
        corpus: PathBuf,

        /// Terms query JSON file
        #[arg(short, long)]
        query: PathBuf,

        /// Index configuration JSON file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Search {
            corpus,
            query,
            config,
            limit,
            sub_bindings,
        } => {
            let engine = open_engine(&corpus, config.as_deref())?;
            if sub_bindings {
                engine.set_sub_bindings_enabled(true);
            }
            let node: Arc<QueryNode> = read_json(&query)?;

            let mut runner = QueryRunner::new(&engine);
            if let Some(limit) = limit {
                runner = runner.with_limit(limit);
            }
            let results = runner.run(&node).context("query failed")?;
            for document in &results {
                println!("{}", serde_json::to_string(&document.view())?);
            }
            info!(documents = results.len(), "search finished");
            engine.close();
        }
        Commands::Terms {
            corpus,
            query,
            config,
        } => {
            let engine = open_engine(&corpus, config.as_deref())?;
            let terms: TermsQuery = read_json(&query)?;
            let result = terms.execute(&engine).context("terms query failed")?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            engine.close();
        }
    }

    Ok(())
}

/// Build the engine for a corpus; without a configuration file every
/// annotation type in the corpus gets a sub-index
fn open_engine(corpus_path: &Path, config_path: Option<&Path>) -> Result<Engine> {
    let corpus = Corpus::load(corpus_path)
        .with_context(|| format!("Failed to load corpus {}", corpus_path.display()))?;
    let config = match config_path {
        Some(path) => read_json::<IndexConfig>(path)?,
        None => IndexConfig::default().with_corpus_annotations(&corpus),
    };
    IndexBuilder::new(config)
        .build(&corpus)
        .context("Failed to build indexes")
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}
