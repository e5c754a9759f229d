//! # docrag CLI
//!
//! Ingest a directory of documents into a vector index and ask questions
//! answered from the indexed content.
//!
//! ## Commands
//!
//! - `docrag ingest --directory <PATH>` - Extract, chunk, embed and index every file
//! - `docrag query <QUESTION>` - Answer a question from the top-K indexed chunks
//! - `docrag count` - Show how many chunks the index holds
//!
//! Every option can also come from the environment (or a `.env` file):
//! `DIRECTORY_PATH`, `COLLECTION_NAME`, `WEAVIATE_SCHEME`, `WEAVIATE_HOST`,
//! `WEAVIATE_API_KEY`, `OPENAI_API_KEY`.
//!
//! ## Examples
//!
//! ```bash
//! docrag ingest --directory ./docs
//! docrag ingest --directory ./docs --extract-concurrency 4 --max-in-flight-batches 2
//! docrag query "What is total cost of product 'Many Season'?"
//!
//! # Single process, no Weaviate needed
//! docrag --in-memory query --directory ./docs "List the key concepts"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use docrag::openai::{OpenAIChatModel, OpenAIConfig, OpenAIEmbeddingProvider};
use docrag::weaviate::{WeaviateConfig, WeaviateVectorIndex};
use docrag::{
    FileOutcome, InMemoryVectorIndex, IngestionPipeline, IngestionReport, QueryPipeline,
    QueryResult, RagConfig, VectorIndex,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docrag")]
#[command(about = "Document ingestion and retrieval-augmented question answering")]
#[command(version)]
struct Cli {
    /// Index (Weaviate class) to write to and read from
    #[arg(long, env = "COLLECTION_NAME", default_value = "Documents", global = true)]
    index: String,

    /// Weaviate URL scheme (http or https)
    #[arg(long, env = "WEAVIATE_SCHEME", default_value = "http", global = true)]
    weaviate_scheme: String,

    /// Weaviate host and port
    #[arg(long, env = "WEAVIATE_HOST", default_value = "localhost:8080", global = true)]
    weaviate_host: String,

    /// Weaviate API key
    #[arg(long, env = "WEAVIATE_API_KEY", hide_env_values = true, global = true)]
    weaviate_api_key: Option<String>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    openai_api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", global = true)]
    openai_base_url: Option<String>,

    /// Embedding model
    #[arg(long, default_value = "text-embedding-3-small", global = true)]
    embedding_model: String,

    /// Chat model used to write answers
    #[arg(long, default_value = "gpt-3.5-turbo", global = true)]
    model: String,

    /// Chat sampling temperature
    #[arg(long, default_value_t = 0.7, global = true)]
    temperature: f32,

    /// Per-request timeout in seconds for remote services
    #[arg(long, default_value_t = 60, global = true)]
    timeout_secs: u64,

    /// Maximum characters per chunk
    #[arg(long, default_value_t = 500, global = true)]
    chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, default_value_t = 50, global = true)]
    chunk_overlap: usize,

    /// Chunks per embedding/upload batch
    #[arg(long, default_value_t = 10, global = true)]
    batch_size: usize,

    /// Chunks retrieved as context for a question
    #[arg(long, default_value_t = 100, global = true)]
    top_k: usize,

    /// Files extracted concurrently while ingesting
    #[arg(long, default_value_t = 1, global = true)]
    extract_concurrency: usize,

    /// Embedding/upload batches allowed in flight at once
    #[arg(long, default_value_t = 1, global = true)]
    max_in_flight_batches: usize,

    /// Walk subdirectories when ingesting
    #[arg(long, global = true)]
    recursive: bool,

    /// Use a process-local index instead of Weaviate
    #[arg(long, global = true)]
    in_memory: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every file in a directory
    Ingest {
        /// Directory to ingest
        #[arg(long, env = "DIRECTORY_PATH")]
        directory: PathBuf,
    },

    /// Answer a question from the indexed documents
    Query {
        /// The question to answer
        question: String,

        /// Directory to ingest first (required with --in-memory)
        #[arg(long, env = "DIRECTORY_PATH")]
        directory: Option<PathBuf>,
    },

    /// Show the number of chunks in the index
    Count,
}

#[derive(Serialize)]
struct CountOutput<'a> {
    index: &'a str,
    count: usize,
}

impl Cli {
    fn rag_config(&self) -> Result<RagConfig> {
        RagConfig::builder()
            .index_name(self.index.clone())
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .batch_size(self.batch_size)
            .top_k(self.top_k)
            .recursive(self.recursive)
            .extract_concurrency(self.extract_concurrency)
            .max_in_flight_batches(self.max_in_flight_batches)
            .build()
            .context("Invalid configuration")
    }

    fn openai_config(&self) -> Result<OpenAIConfig> {
        let Some(api_key) = self.openai_api_key.clone() else {
            bail!("OPENAI_API_KEY is not set");
        };
        let mut config = OpenAIConfig::new(api_key)
            .with_embedding_model(self.embedding_model.clone())
            .with_chat_model(self.model.clone())
            .with_temperature(self.temperature)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(base_url) = &self.openai_base_url {
            config = config.with_base_url(base_url.clone());
        }
        Ok(config)
    }

    /// The one index client shared by every pipeline in this process.
    fn vector_index(&self) -> Result<Arc<dyn VectorIndex>> {
        if self.in_memory {
            return Ok(Arc::new(InMemoryVectorIndex::new()));
        }

        let mut config = WeaviateConfig::new(&self.weaviate_scheme, &self.weaviate_host)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(key) = &self.weaviate_api_key {
            config = config.with_api_key(key.clone());
        }
        let index = WeaviateVectorIndex::new(config).context("Failed to create Weaviate client")?;
        Ok(Arc::new(index))
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Cancel `token` on the first Ctrl-C. Work in progress finishes; the rest is skipped.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current file or batch");
            token.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = cli.rag_config()?;
    let index = cli.vector_index()?;

    match &cli.command {
        Commands::Ingest { directory } => {
            let openai = cli.openai_config()?;
            let report = ingest(&config, &openai, Arc::clone(&index), directory).await?;
            print_report(&report, cli.format)?;

            let count = index.count(&config.index_name).await.context("Failed to count chunks")?;
            print_count(&config.index_name, count, cli.format)?;
        }
        Commands::Query { question, directory } => {
            let openai = cli.openai_config()?;
            match directory {
                Some(directory) if cli.in_memory => {
                    let report = ingest(&config, &openai, Arc::clone(&index), directory).await?;
                    if cli.format == OutputFormat::Text {
                        print_report(&report, cli.format)?;
                    }
                }
                None if cli.in_memory => bail!("--in-memory queries need --directory to ingest first"),
                _ => {}
            }

            let pipeline = QueryPipeline::builder()
                .config(config.clone())
                .embedding_provider(Arc::new(OpenAIEmbeddingProvider::from_config(&openai)?))
                .vector_index(index)
                .language_model(Arc::new(OpenAIChatModel::from_config(&openai)?))
                .build()?;

            let result = pipeline.ask(question).await.context("Query failed")?;
            print_answer(&result, cli.format)?;
        }
        Commands::Count => {
            let count = index.count(&config.index_name).await.context("Failed to count chunks")?;
            print_count(&config.index_name, count, cli.format)?;
        }
    }

    Ok(())
}

async fn ingest(
    config: &RagConfig,
    openai: &OpenAIConfig,
    index: Arc<dyn VectorIndex>,
    directory: &Path,
) -> Result<IngestionReport> {
    let pipeline = IngestionPipeline::builder()
        .config(config.clone())
        .embedding_provider(Arc::new(OpenAIEmbeddingProvider::from_config(openai)?))
        .vector_index(index)
        .build()?;

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    info!(directory = %directory.display(), index = %config.index_name, "ingesting");
    pipeline
        .ingest_with_cancel(directory, &cancel)
        .await
        .with_context(|| format!("Failed to ingest {}", directory.display()))
}

fn print_report(report: &IngestionReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            for file in &report.files {
                let status = match &file.outcome {
                    FileOutcome::Indexed => "indexed".to_string(),
                    FileOutcome::Skipped => "skipped".to_string(),
                    FileOutcome::ExtractionFailed(e) => format!("extraction failed: {e}"),
                    FileOutcome::EmbeddingFailed(e) => format!("embedding failed: {e}"),
                    FileOutcome::IndexFailed(e) => format!("index failed: {e}"),
                };
                println!(
                    "{:<60} {:>5}/{:<5} {status}",
                    file.path.display(),
                    file.chunks_indexed,
                    file.chunks
                );
            }
            println!(
                "\n{} files, {} failed, {} chunks in {} batches ({} batches failed){}",
                report.files.len(),
                report.failures().count(),
                report.chunks_embedded,
                report.batches_written,
                report.batches_failed,
                if report.cancelled { ", cancelled" } else { "" }
            );
        }
    }
    Ok(())
}

fn print_count(index: &str, count: usize, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&CountOutput { index, count })?),
        OutputFormat::Text => println!("Index '{index}' holds {count} chunks"),
    }
    Ok(())
}

fn print_answer(result: &QueryResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Text => {
            println!("Query: {}\n", result.question);
            println!("Answer: {}\n", result.answer);
            if result.matches.is_empty() {
                println!("No matching chunks were found.");
                return Ok(());
            }
            println!("Sources:");
            for (rank, hit) in result.matches.iter().enumerate() {
                println!(
                    "  {:>3}. {}#{} (score {:.3})",
                    rank + 1,
                    hit.chunk.source_path.display(),
                    hit.chunk.chunk_index,
                    hit.score
                );
            }
        }
    }
    Ok(())
}
