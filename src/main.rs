use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ragpipe::chunking::ChunkingMethod;
use ragpipe::commands::{build, query, show_config, show_status};
use ragpipe::config::Config;
use ragpipe::{RagError, Result};

#[derive(Parser)]
#[command(name = "ragpipe")]
#[command(about = "Local retrieval-augmented generation over your documents")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build or update the vector index from documents in a directory
    Build {
        /// Directory containing input documents
        #[arg(long)]
        input_dir: Option<PathBuf>,
        /// Path of the vector index file
        #[arg(long)]
        index: Option<PathBuf>,
        /// Path of the chunk store file
        #[arg(long)]
        chunk_store: Option<PathBuf>,
        /// Chunk size in characters (character mode)
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Overlap between consecutive chunks in characters
        #[arg(long)]
        overlap: Option<usize>,
        /// Chunking method
        #[arg(long, value_enum)]
        chunking_method: Option<ChunkingMethod>,
        /// Embedding model name
        #[arg(long)]
        embedding_model: Option<String>,
        /// Discard any existing index and store instead of appending
        #[arg(long)]
        rebuild: bool,
    },
    /// Query the index, single-shot or interactively
    Query {
        /// Direct query text
        query: Option<String>,
        /// Enable interactive query mode
        #[arg(long)]
        interactive: bool,
        /// Number of chunks to retrieve
        #[arg(long)]
        top_k: Option<usize>,
        /// Keywords retrieved chunks must all contain (case-insensitive)
        #[arg(long, num_args = 1..)]
        keywords: Vec<String>,
        /// Number of previous conversation turns to include in context
        #[arg(long)]
        context_turns: Option<usize>,
        /// Show the retrieved chunks before the answer
        #[arg(long)]
        show_context: bool,
        /// Path of the vector index file
        #[arg(long)]
        index: Option<PathBuf>,
        /// Path of the chunk store file
        #[arg(long)]
        chunk_store: Option<PathBuf>,
    },
    /// Show the effective configuration
    Config,
    /// Check model server connectivity and artifact health
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config);

    match cli.command {
        Commands::Build {
            input_dir,
            index,
            chunk_store,
            chunk_size,
            overlap,
            chunking_method,
            embedding_model,
            rebuild,
        } => {
            if let Some(input_dir) = input_dir {
                config.paths.input_dir = input_dir;
            }
            if let Some(index) = index {
                config.paths.index_path = index;
            }
            if let Some(chunk_store) = chunk_store {
                config.paths.chunk_store_path = chunk_store;
            }
            if let Some(chunk_size) = chunk_size {
                config.chunking.chunk_size = chunk_size;
            }
            if let Some(overlap) = overlap {
                config.chunking.overlap = overlap;
            }
            if let Some(chunking_method) = chunking_method {
                config.chunking.method = chunking_method;
            }
            if let Some(embedding_model) = embedding_model {
                config.ollama.embedding_model = embedding_model;
            }
            validate(&config)?;
            build(&config, rebuild)?;
        }
        Commands::Query {
            query: query_text,
            interactive,
            top_k,
            keywords,
            context_turns,
            show_context,
            index,
            chunk_store,
        } => {
            if let Some(top_k) = top_k {
                config.retrieval.top_k = top_k;
            }
            if let Some(context_turns) = context_turns {
                config.retrieval.context_turns = context_turns;
            }
            if let Some(index) = index {
                config.paths.index_path = index;
            }
            if let Some(chunk_store) = chunk_store {
                config.paths.chunk_store_path = chunk_store;
            }
            validate(&config)?;
            query(&config, query_text, interactive, keywords, show_context)?;
        }
        Commands::Config => {
            show_config(&config)?;
        }
        Commands::Status => {
            validate(&config)?;
            show_status(&config)?;
        }
    }

    Ok(())
}

fn validate(config: &Config) -> Result<()> {
    config
        .validate()
        .map_err(|e| RagError::Config(e.to_string()))
}
