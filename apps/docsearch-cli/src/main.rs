use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use docsearch_core::config::{Config, Settings};
use docsearch_core::loader::DocumentLoader;
use docsearch_core::segmenter::Segmenter;
use docsearch_core::types::ScoredChunk;
use docsearch_hybrid::{HybridRetriever, SearchParams};

/// Hybrid (dense + BM25) document search
#[derive(Parser)]
#[command(name = "docsearch", version)]
#[command(about = "Index a document folder and search it with dense + keyword retrieval")]
struct Cli {
    /// Configuration file (defaults to ./config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, segment and index a directory of .md/.txt/.json documents
    Ingest {
        /// Source directory (defaults to data.raw_dir)
        dir: Option<PathBuf>,
        /// Clear both indexes first
        #[arg(long)]
        reset: bool,
        /// Only index the first N files
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Run a hybrid search
    Search {
        query: String,
        /// Number of results (defaults to retrieval.top_k_final)
        #[arg(short)]
        k: Option<usize>,
        #[arg(long)]
        dense_weight: Option<f32>,
        #[arg(long)]
        sparse_weight: Option<f32>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print index statistics as JSON
    Stats,
    /// Clear both indexes
    Reset,
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let config = match path {
        Some(p) => Config::load_from(p),
        None => Config::load(),
    }
    .context("loading configuration")?;
    let mut settings = config.settings().context("invalid configuration")?;
    let base = match path.and_then(Path::parent) {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    settings.resolve_paths(&base);
    Ok(settings)
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;
    init_logging(&settings.log_level);

    let retriever = HybridRetriever::from_settings(&settings).await.context("opening indexes")?;

    match cli.command {
        Commands::Ingest { dir, reset, limit } => {
            let dir = dir.unwrap_or_else(|| settings.data.raw_dir.clone());
            if reset {
                retriever.reset().await.context("resetting indexes")?;
            }
            let loader = DocumentLoader::new();
            let docs = match limit {
                Some(n) => loader.load_directory_limited(&dir, n),
                None => loader.load_directory(&dir),
            }
            .with_context(|| format!("loading documents from {}", dir.display()))?;
            let chunks = Segmenter::new(&settings.chunking)?.segment_all(&docs);

            let pb = spinner(&format!("indexing {} chunks", chunks.len()));
            let report = retriever.index_chunks(&chunks).await;
            pb.finish_and_clear();
            let report = report.context("indexing chunks")?;
            info!(dense = report.dense, sparse = report.sparse, "ingest finished");
            println!("Ingested {} documents into {} chunks from {}", docs.len(), chunks.len(), dir.display());
        }
        Commands::Search { query, k, dense_weight, sparse_weight, json } => {
            let params = SearchParams { k, dense_weight, sparse_weight };
            let results = retriever.search_with(&query, params).await.context("search failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_results(&query, &results);
            }
        }
        Commands::Stats => {
            let stats = retriever.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Reset => {
            retriever.reset().await.context("resetting indexes")?;
            println!("Both indexes cleared");
        }
    }
    Ok(())
}

fn print_results(query: &str, results: &[ScoredChunk]) {
    if results.is_empty() {
        println!("No relevant results for \"{query}\"");
        return;
    }
    println!("Results for \"{query}\":\n");
    for (i, r) in results.iter().enumerate() {
        let rank = |r: Option<usize>| r.map_or_else(|| "-".to_string(), |v| v.to_string());
        println!(
            "{}. [{:.4}] {} ({} > {})  dense: {}  sparse: {}",
            i + 1,
            r.score,
            r.id(),
            r.chunk.source,
            r.chunk.section_title,
            rank(r.dense_rank),
            rank(r.sparse_rank)
        );
        let snippet: String = r.chunk.text.chars().take(160).collect();
        println!("   {}\n", snippet.replace('\n', " "));
    }
}
