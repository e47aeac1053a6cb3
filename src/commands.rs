use console::style;
use dialoguer::Input;
use tracing::{error, info};

use crate::config::Config;
use crate::embeddings::Embedder;
use crate::embeddings::ollama::OllamaClient;
use crate::indexer::{BuildOptions, IndexBuilder};
use crate::query::{ConversationTurn, QueryEngine, QueryOptions, QueryOutcome, RetrievedChunk};
use crate::store::ChunkStore;
use crate::vector::VectorIndex;
use crate::{RagError, Result};

/// Build or append to the vector index and chunk store from the configured
/// input directory.
#[inline]
pub fn build(config: &Config, rebuild: bool) -> Result<()> {
    info!("Starting index build");

    let client =
        OllamaClient::new(&config.ollama).map_err(|e| RagError::Embedding(format!("{e:#}")))?;
    let embedder = Embedder::new(Box::new(client), config.ollama.embedding_dimension);

    let options = BuildOptions {
        input_dir: config.paths.input_dir.clone(),
        index_path: config.paths.index_path.clone(),
        chunk_store_path: config.paths.chunk_store_path.clone(),
        method: config.chunking.method,
        chunk_size: config.chunking.chunk_size,
        overlap: config.chunking.overlap,
        rebuild,
    };

    let stats = IndexBuilder::new(&embedder, options).run()?;

    println!("Build complete.");
    println!("  Files processed: {}", stats.files_processed);
    println!("  Files skipped: {}", stats.files_skipped);
    println!("  Chunks embedded: {}", stats.chunks_embedded);
    println!("  Index size: {} vectors", stats.index_len);

    Ok(())
}

/// Answer a single query or run an interactive session.
#[inline]
pub fn query(
    config: &Config,
    query_text: Option<String>,
    interactive: bool,
    keywords: Vec<String>,
    show_context: bool,
) -> Result<()> {
    let client =
        OllamaClient::new(&config.ollama).map_err(|e| RagError::Embedding(format!("{e:#}")))?;
    let embedder = Embedder::new(Box::new(client.clone()), config.ollama.embedding_dimension);

    let options = QueryOptions {
        top_k: config.retrieval.top_k,
        keywords,
        context_turns: config.retrieval.context_turns,
        max_tokens: config.generation.max_tokens,
        prompt_char_budget: config.generation.prompt_char_budget,
    };

    let engine = QueryEngine::open(
        &config.paths.index_path,
        &config.paths.chunk_store_path,
        &embedder,
        &client,
        options,
    )?;

    if interactive {
        run_interactive_session(&engine, show_context)
    } else if let Some(query_text) = query_text {
        match engine.ask(&query_text, &[])? {
            QueryOutcome::Answered { answer, retrieved } => {
                if show_context {
                    print_retrieved(&retrieved);
                }
                println!("Answer: {answer}");
            }
            QueryOutcome::NoRelevantChunks => {
                println!("No relevant chunks found.");
            }
        }
        Ok(())
    } else {
        Err(RagError::Config(
            "no query provided; pass a query argument or use --interactive".to_string(),
        ))
    }
}

/// Interactive query loop. Per-turn failures are reported and the session
/// continues; only `:quit` ends it.
fn run_interactive_session(engine: &QueryEngine<'_>, show_context: bool) -> Result<()> {
    println!("Interactive query mode. Type your question or ':quit' to exit.");

    let mut history: Vec<ConversationTurn> = Vec::new();

    loop {
        let input: String = Input::new()
            .with_prompt("Query")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| RagError::Other(e.into()))?;

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case(":quit") {
            break;
        }

        match engine.ask(input, &history) {
            Ok(QueryOutcome::Answered { answer, retrieved }) => {
                if show_context {
                    print_retrieved(&retrieved);
                }
                println!("Answer: {answer}");
                history.push(ConversationTurn::user(input));
                history.push(ConversationTurn::assistant(answer));
            }
            Ok(QueryOutcome::NoRelevantChunks) => {
                println!("No relevant chunks found.");
                history.push(ConversationTurn::user(input));
            }
            Err(e) => {
                error!("Query failed: {e}");
                println!(
                    "{} {e}",
                    style("An error occurred while answering this query:").red()
                );
            }
        }
    }

    Ok(())
}

fn print_retrieved(retrieved: &[RetrievedChunk]) {
    println!("Retrieved chunks:");
    for chunk in retrieved {
        let preview: String = chunk.text.chars().take(100).collect();
        println!(
            "- Index: {}, Distance: {:.4}, File: {}, Text: {preview}...",
            chunk.index, chunk.distance, chunk.filepath
        );
    }
}

/// Print the effective configuration as TOML.
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| RagError::Config(format!("failed to render config: {e}")))?;
    println!("{rendered}");
    Ok(())
}

/// Report connectivity to the model server and the state of the persisted
/// artifacts.
#[inline]
pub fn show_status(config: &Config) -> Result<()> {
    println!("ragpipe status");
    println!("{}", "=".repeat(40));

    println!("Ollama:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "  {} connected ({}:{})",
                    style("ok").green(),
                    config.ollama.host,
                    config.ollama.port
                );
                println!("  embedding model: {}", config.ollama.embedding_model);
                println!("  llm model: {}", config.ollama.llm_model);
            }
            Err(e) => {
                println!("  {} unhealthy: {e:#}", style("warn").yellow());
            }
        },
        Err(e) => {
            println!("  {} failed to construct client: {e:#}", style("fail").red());
        }
    }

    println!("Artifacts:");
    let index = match VectorIndex::load(&config.paths.index_path) {
        Ok(index) => {
            println!(
                "  {} index: {} vectors, dimension {}",
                style("ok").green(),
                index.len(),
                index.dimension()
            );
            Some(index)
        }
        Err(e) => {
            println!("  {} index: {e}", style("fail").red());
            None
        }
    };

    let store = match ChunkStore::load(&config.paths.chunk_store_path) {
        Ok(store) => {
            println!(
                "  {} chunk store: {} records",
                style("ok").green(),
                store.len()
            );
            Some(store)
        }
        Err(e) => {
            println!("  {} chunk store: {e}", style("fail").red());
            None
        }
    };

    if let (Some(index), Some(store)) = (index, store) {
        if index.len() == store.len() {
            println!("  {} index and store are aligned", style("ok").green());
        } else {
            println!(
                "  {} misaligned: {} vectors vs {} records",
                style("fail").red(),
                index.len(),
                store.len()
            );
        }
    }

    Ok(())
}
