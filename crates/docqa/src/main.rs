//! # docqa CLI
//!
//! Command-line front end for docqa, a multi-tenant document
//! question-answering pipeline.
//!
//! Documents are uploaded into a workspace, split into overlapping word
//! windows, embedded and stored in that workspace's own vector collection.
//! Questions are answered from the closest chunks of one workspace only.
//!
//! ## Commands
//!
//! - `docqa ingest <WORKSPACE> <FILE>` - Extract, chunk, embed and store a document
//! - `docqa ask <WORKSPACE> <QUERY>` - Answer a question with cited sources
//! - `docqa search <WORKSPACE> <QUERY>` - Show the closest chunks without generation
//! - `docqa delete <WORKSPACE> <DOC_ID>` - Remove one document's chunks
//! - `docqa purge <WORKSPACE>` - Remove every chunk of a workspace
//! - `docqa status <WORKSPACE>` - Show the workspace's chunk count
//!
//! ## Examples
//!
//! ```bash
//! docqa ingest team-a ~/papers/attention.pdf
//! docqa ask team-a "What does multi-head attention compute?"
//! docqa search team-a "positional encoding" -k 3 --format json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docqa_chunker::WordWindowChunker;
use docqa_core::{Answer, Embedder, EmbeddingConfig, Generator, RetrievalResult, VectorIndex};
#[cfg(feature = "candle")]
use docqa_embed::CandleEmbedder;
use docqa_embed::{EmbedderPool, HashingEmbedder};
use docqa_extract::ExtractorRegistry;
use docqa_index::{
    IndexUpdate, IngestJob, IngestWorker, IngestionService, LogStatusSink, WorkspaceIndex,
};
use docqa_query::{ChatGenerator, Retriever};
#[cfg(feature = "lancedb")]
use docqa_store::LanceIndex;
#[cfg(not(feature = "lancedb"))]
use docqa_store::MemoryIndex;
use docqa_store::collection_name;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod config;

use config::{Config, EmbeddingBackend};

/// Jobs the ingest queue holds before `submit` waits.
const INGEST_QUEUE_SIZE: usize = 16;

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Question answering over per-workspace document collections")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.config/docqa/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a document into a workspace
    Ingest {
        /// Workspace identifier
        workspace: String,

        /// File to upload (.pdf, .txt, .md, .docx)
        file: PathBuf,

        /// Document id (default: random UUID)
        #[arg(long)]
        doc_id: Option<String>,
    },

    /// Answer a question from a workspace's documents
    Ask {
        /// Workspace identifier
        workspace: String,

        /// Question
        query: String,

        /// Number of chunks to retrieve
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Show the closest chunks without generating an answer
    Search {
        /// Workspace identifier
        workspace: String,

        /// Query string
        query: String,

        /// Number of chunks to retrieve
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Delete one document's chunks
    Delete {
        /// Workspace identifier
        workspace: String,

        /// Document id given at ingestion
        doc_id: String,
    },

    /// Delete every chunk in a workspace
    Purge {
        /// Workspace identifier
        workspace: String,
    },

    /// Show workspace status
    Status {
        /// Workspace identifier
        workspace: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Print sample configuration file
    Init,
    /// Show config file path
    Path,
}

#[derive(Serialize)]
struct IngestOutput {
    workspace_id: String,
    doc_id: String,
    filename: String,
    status: String,
    chunk_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    duration_ms: u128,
}

#[derive(Serialize)]
struct AskOutput {
    workspace_id: String,
    query: String,
    #[serde(flatten)]
    answer: Answer,
    duration_ms: u128,
}

#[derive(Serialize)]
struct SearchOutput {
    workspace_id: String,
    query: String,
    results: Vec<RetrievalResult>,
    duration_ms: u128,
}

#[derive(Serialize)]
struct DeleteOutput {
    workspace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    doc_id: Option<String>,
    deleted: u64,
}

#[derive(Serialize)]
struct StatusOutput {
    workspace_id: String,
    collection: String,
    chunk_count: u64,
    embedding_model: String,
    dimension: usize,
}

/// Install the global subscriber.
///
/// `--verbose` wins, then `RUST_LOG`, then the configured level.
fn init_logging(verbose: bool, level: &str) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(Some(path.to_path_buf()))
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load().context("Failed to load config"),
    }
}

/// Create the embedder selected by the config.
async fn create_embedder(
    config: &Config,
    data_dir: &Path,
    load_model: bool,
) -> Result<Arc<dyn Embedder>> {
    match config.embedding.backend {
        EmbeddingBackend::Hashing => Ok(Arc::new(HashingEmbedder::with_dimension(
            config.embedding.dimension,
        ))),
        #[cfg(feature = "candle")]
        EmbeddingBackend::Candle => {
            let embedder = CandleEmbedder::with_model(
                data_dir.join("models"),
                &config.embedding.model,
                config.embedding.dimension,
            );
            if load_model {
                info!("Initializing embedder (this may download the model on first run)...");
                embedder
                    .init()
                    .await
                    .context("Failed to initialize embedder")?;
            }
            Ok(Arc::new(embedder))
        }
        #[cfg(not(feature = "candle"))]
        EmbeddingBackend::Candle => {
            let _ = (data_dir, load_model);
            anyhow::bail!(
                "docqa was built without the `candle` feature; set embedding.backend = \"hashing\""
            )
        }
    }
}

/// Create the vector store under the data directory.
fn create_store(config: &Config, data_dir: &Path) -> Arc<dyn VectorIndex> {
    #[cfg(feature = "lancedb")]
    {
        Arc::new(LanceIndex::new(
            data_dir.join("index.lance"),
            config.embedding.dimension,
        ))
    }
    #[cfg(not(feature = "lancedb"))]
    {
        warn!(
            "docqa was built without the `lancedb` feature; chunks in {} will not persist",
            data_dir.display()
        );
        Arc::new(MemoryIndex::new(config.embedding.dimension))
    }
}

/// Create the shared workspace index: store plus embedder singleton.
async fn create_index(config: &Config, load_model: bool) -> Result<Arc<WorkspaceIndex>> {
    let data_dir = config.data_dir().context("Failed to get data directory")?;
    debug!("Using data directory {}", data_dir.display());

    let embedder = create_embedder(config, &data_dir, load_model).await?;
    let store = create_store(config, &data_dir);
    store.init().await.context("Failed to initialize store")?;

    let pool = Arc::new(EmbedderPool::with_config(
        embedder,
        config.embedding.max_concurrent,
        EmbeddingConfig {
            batch_size: config.embedding.batch_size,
            ..EmbeddingConfig::default()
        },
    ));

    let index = WorkspaceIndex::new(store, pool).context("Failed to create workspace index")?;
    info!(
        "Workspace index ready ({}, {} dims)",
        index.embedder().model_name(),
        index.embedder().dimension()
    );
    Ok(Arc::new(index))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging(cli.verbose, &config.logging.level)?;

    match cli.command {
        Commands::Ingest {
            workspace,
            file,
            doc_id,
        } => {
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .context("File path has no file name")?;
            let size = std::fs::metadata(&file)
                .with_context(|| format!("Failed to stat {}", file.display()))?
                .len();

            let file_type = config
                .upload_policy()
                .validate(&filename, size)
                .with_context(|| format!("Rejected {filename}"))?;
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;

            let doc_id = doc_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let start = Instant::now();

            let index = create_index(&config, true).await?;
            let service = IngestionService::new(
                Arc::new(ExtractorRegistry::with_defaults()),
                Arc::new(WordWindowChunker::new()),
                config.chunk_config(),
                index,
            )
            .context("Invalid chunking configuration")?;

            let worker =
                IngestWorker::spawn(Arc::new(service), Arc::new(LogStatusSink), INGEST_QUEUE_SIZE);
            let mut updates = worker.subscribe();

            worker
                .submit(IngestJob {
                    workspace_id: workspace.clone(),
                    doc_id: doc_id.clone(),
                    filename: filename.clone(),
                    declared_type: file_type.extension().to_string(),
                    bytes,
                })
                .await?;

            let outcome = loop {
                match updates.recv().await {
                    Ok(IndexUpdate::DocumentIndexed {
                        doc_id: id,
                        chunk_count,
                        ..
                    }) if id == doc_id => break Ok(chunk_count),
                    Ok(IndexUpdate::DocumentFailed { doc_id: id, error, .. }) if id == doc_id => {
                        break Err(error);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Missed {} index updates", skipped);
                    }
                    Err(RecvError::Closed) => anyhow::bail!("Ingest worker stopped unexpectedly"),
                }
            };
            worker.shutdown().await?;

            let output = IngestOutput {
                workspace_id: workspace,
                doc_id,
                filename,
                status: if outcome.is_ok() { "ready" } else { "error" }.to_string(),
                chunk_count: outcome.as_ref().copied().unwrap_or(0),
                error: outcome.as_ref().err().cloned(),
                duration_ms: start.elapsed().as_millis(),
            };

            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
                OutputFormat::Text => match &output.error {
                    None => println!(
                        "Indexed {} as {} in workspace {} ({} chunks, {} ms)",
                        output.filename,
                        output.doc_id,
                        output.workspace_id,
                        output.chunk_count,
                        output.duration_ms
                    ),
                    Some(error) => println!("Failed to index {}: {}", output.filename, error),
                },
            }

            if let Err(error) = outcome {
                anyhow::bail!("Ingestion failed: {error}");
            }
        }

        Commands::Ask {
            workspace,
            query,
            k,
        } => {
            let index = create_index(&config, true).await?;
            let generator: Arc<dyn Generator> = Arc::new(
                ChatGenerator::new(config.generator_config())
                    .context("Failed to create generation client")?,
            );
            let retriever = Retriever::new(index, generator, config.retriever_settings());

            let start = Instant::now();
            let answer = retriever
                .answer(&workspace, &query, k)
                .await
                .context("Failed to answer query")?;
            let output = AskOutput {
                workspace_id: workspace,
                query,
                answer,
                duration_ms: start.elapsed().as_millis(),
            };

            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
                OutputFormat::Text => {
                    println!("{}\n", output.answer.answer);
                    if !output.answer.sources.is_empty() {
                        println!("Sources:");
                        for (i, source) in output.answer.sources.iter().enumerate() {
                            println!(
                                "{}. {} [{} #{}] (score: {:.3})",
                                i + 1,
                                source.filename,
                                source.doc_id,
                                source.chunk_index,
                                source.score
                            );
                            println!("   {}", truncate(&source.preview, 100));
                        }
                    }
                    println!("\n({} ms)", output.duration_ms);
                }
            }
        }

        Commands::Search {
            workspace,
            query,
            k,
        } => {
            let index = create_index(&config, true).await?;
            let generator: Arc<dyn Generator> = Arc::new(
                ChatGenerator::new(config.generator_config())
                    .context("Failed to create generation client")?,
            );
            let retriever = Retriever::new(index, generator, config.retriever_settings());

            let start = Instant::now();
            let results = retriever
                .search(&workspace, &query, k)
                .await
                .context("Query execution failed")?;
            let output = SearchOutput {
                workspace_id: workspace,
                query,
                results,
                duration_ms: start.elapsed().as_millis(),
            };

            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
                OutputFormat::Text => {
                    println!("Query: {}\n", output.query);
                    if output.results.is_empty() {
                        println!("No results found.");
                    } else {
                        for (i, result) in output.results.iter().enumerate() {
                            println!(
                                "{}. {} [{} #{}] (score: {:.3})",
                                i + 1,
                                result.filename,
                                result.doc_id,
                                result.chunk_index,
                                result.score
                            );
                            println!("   {}", truncate(&result.text, 100));
                            println!();
                        }
                    }
                }
            }
        }

        Commands::Delete { workspace, doc_id } => {
            let index = create_index(&config, false).await?;
            let deleted = index
                .delete_by_document(&workspace, &doc_id)
                .await
                .context("Failed to delete document")?;

            let output = DeleteOutput {
                workspace_id: workspace,
                doc_id: Some(doc_id),
                deleted,
            };
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
                OutputFormat::Text => println!("Deleted {} chunks", output.deleted),
            }
        }

        Commands::Purge { workspace } => {
            let index = create_index(&config, false).await?;
            let deleted = index
                .purge_workspace(&workspace)
                .await
                .context("Failed to purge workspace")?;

            let output = DeleteOutput {
                workspace_id: workspace,
                doc_id: None,
                deleted,
            };
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
                OutputFormat::Text => println!(
                    "Purged {} chunks from workspace {}",
                    output.deleted, output.workspace_id
                ),
            }
        }

        Commands::Status { workspace } => {
            let index = create_index(&config, false).await?;
            let chunk_count = index.count(&workspace).await?;

            let output = StatusOutput {
                collection: collection_name(&workspace),
                workspace_id: workspace,
                chunk_count,
                embedding_model: index.embedder().model_name().to_string(),
                dimension: index.embedder().dimension(),
            };
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
                OutputFormat::Text => {
                    println!("Workspace {}", output.workspace_id);
                    println!("  Collection: {}", output.collection);
                    println!("  Chunks:     {}", output.chunk_count);
                    println!(
                        "  Embedder:   {} ({} dims)",
                        output.embedding_model, output.dimension
                    );
                }
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&config)
                            .context("Failed to serialize config")?
                    );
                }
                OutputFormat::Text => {
                    println!(
                        "{}",
                        toml::to_string_pretty(&config).context("Failed to serialize config")?
                    );
                }
            },
            ConfigAction::Init => {
                println!("{}", Config::sample_toml());
            }
            ConfigAction::Path => {
                if let Some(path) = Config::config_path() {
                    println!("{}", path.display());
                } else {
                    println!("Could not determine config directory");
                }
            }
        },
    }

    Ok(())
}

/// Flatten to one line and cut to `max_chars` characters, adding ellipsis if needed.
fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.replace('\n', " ").replace('\r', "");
    if s.chars().count() <= max_chars {
        s
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
