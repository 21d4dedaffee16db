//! Hindsight - meeting transcript ingestion and semantic recall.
//!
//! Main entry point for the Hindsight CLI.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use hindsight_index::VectorIndex;
use hindsight_llm::{AnalyzerConfig, Embedder, OpenAiAnalyzer, OpenAiEmbedder};
use hindsight_pipeline::{DEFAULT_SEARCH_LIMIT, Pipeline};
use hindsight_server::{Server, ServerConfig};
use hindsight_store::RelationalStore;
use hindsight_types::TranscriptSubmission;

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Hindsight - meeting transcript ingestion and semantic recall
#[derive(Parser)]
#[command(name = "hindsight")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding both databases
    #[arg(long, global = true, env = "HINDSIGHT_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Address to bind
        #[arg(long, env = "HINDSIGHT_BIND", default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },

    /// Ingest a transcript submission from a JSON file
    Ingest {
        /// Path to the submission JSON
        file: PathBuf,
    },

    /// Search ingested transcripts
    Search {
        /// Free-text query
        query: String,

        /// Maximum result count
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },

    /// Re-run the vector-index finalize step for any transcript that missed it
    Reindex,
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "hindsight=debug,hindsight_pipeline=debug,hindsight_store=debug,\
         hindsight_index=debug,hindsight_llm=debug,hindsight_server=debug,info"
    } else {
        "hindsight=info,hindsight_pipeline=info,hindsight_store=info,\
         hindsight_index=info,hindsight_llm=info,hindsight_server=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Serve { bind } => serve(&cli.data_dir, bind).await,
        Commands::Ingest { file } => ingest(&cli.data_dir, &file).await,
        Commands::Search { query, limit } => search(&cli.data_dir, &query, limit).await,
        Commands::Reindex => reindex(&cli.data_dir).await,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

async fn serve(data_dir: &Path, bind: SocketAddr) -> Result<()> {
    let pipeline = Arc::new(build_pipeline(data_dir)?);

    // Close any gap a crash mid-ingestion left behind before serving traffic
    let repaired = pipeline.resume_pending().await?;
    if repaired > 0 {
        info!(repaired, "Finalized pending embeddings from a previous run");
    }

    let server = Server::new(pipeline, ServerConfig::default().with_bind_address(bind));
    server.run().await.context("server failed")
}

async fn ingest(data_dir: &Path, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let submission: TranscriptSubmission =
        serde_json::from_str(&raw).context("submission file is not valid JSON")?;

    let pipeline = build_pipeline(data_dir)?;
    let report = pipeline.ingest(submission).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn search(data_dir: &Path, query: &str, limit: usize) -> Result<()> {
    let pipeline = build_pipeline(data_dir)?;
    let results = pipeline.search(query, limit).await?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

async fn reindex(data_dir: &Path) -> Result<()> {
    let pipeline = build_pipeline(data_dir)?;
    let repaired = pipeline.resume_pending().await?;
    println!("finalized {repaired} pending embedding(s)");
    Ok(())
}

/// Wire up the pipeline: OpenAI adapters from the environment, both stores
/// under the data directory.
fn build_pipeline(data_dir: &Path) -> Result<Pipeline> {
    let analyzer = OpenAiAnalyzer::new(AnalyzerConfig::from_env()?)?;
    let embedder = OpenAiEmbedder::from_env()?;

    let store = RelationalStore::open(data_dir.join("hindsight.db"))?;
    let index = VectorIndex::open(
        data_dir.join("vectors.db"),
        embedder.dimensions(),
        embedder.name(),
    )?;

    Ok(Pipeline::new(
        Arc::new(analyzer),
        Arc::new(embedder),
        Arc::new(store),
        Arc::new(index),
    )?)
}
