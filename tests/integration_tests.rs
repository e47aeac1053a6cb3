#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end pipeline tests: build an index from documents on disk, then
// answer queries against the persisted artifacts, with deterministic model
// stubs standing in for the Ollama server.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use ragpipe::chunking::ChunkingMethod;
use ragpipe::embeddings::{Embedder, EmbeddingModel};
use ragpipe::indexer::{BuildOptions, IndexBuilder};
use ragpipe::query::{ConversationTurn, LanguageModel, QueryEngine, QueryOptions, QueryOutcome};
use ragpipe::store::ChunkStore;
use ragpipe::vector::VectorIndex;

/// Deterministic embedding stub: maps text to a vector of simple character
/// statistics so that similar texts land near each other.
struct StatsModel;

impl EmbeddingModel for StatsModel {
    fn embed_batch(&self, texts: &[String]) -> ragpipe::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let t = t.to_lowercase();
                vec![
                    t.matches("rust").count() as f32,
                    t.matches("python").count() as f32,
                    t.chars().count() as f32 / 100.0,
                ]
            })
            .collect())
    }
}

/// Canned language model that folds the prompt length into its answer so
/// tests can observe that it was called with a real prompt.
struct CannedLlm;

impl LanguageModel for CannedLlm {
    fn complete(&self, prompt: &str, _max_tokens: u32) -> ragpipe::Result<String> {
        assert!(prompt.starts_with("Context information is below."));
        Ok("canned answer".to_string())
    }
}

fn write_corpus(dir: &Path) {
    fs::write(
        dir.join("rust.txt"),
        "rust is a systems language\n\nrust has ownership and borrowing",
    )
    .expect("should write");
    fs::write(dir.join("python.txt"), "python is a scripting language").expect("should write");
}

fn build_options(docs: &Path, artifacts: &Path) -> BuildOptions {
    BuildOptions {
        input_dir: docs.to_path_buf(),
        index_path: artifacts.join("index.bin"),
        chunk_store_path: artifacts.join("chunk_store.json"),
        method: ChunkingMethod::Paragraph,
        chunk_size: 500,
        overlap: 50,
        rebuild: false,
    }
}

fn query_options() -> QueryOptions {
    QueryOptions {
        top_k: 2,
        keywords: Vec::new(),
        context_turns: 0,
        max_tokens: 64,
        prompt_char_budget: 4096,
    }
}

#[test]
fn build_then_query_round_trip() {
    let docs = TempDir::new().expect("should create temp dir");
    let artifacts = TempDir::new().expect("should create temp dir");
    write_corpus(docs.path());

    let embedder = Embedder::new(Box::new(StatsModel), 3);
    let options = build_options(docs.path(), artifacts.path());

    let stats = IndexBuilder::new(&embedder, options.clone())
        .run()
        .expect("build succeeds");
    assert_eq!(stats.files_processed, 2);
    assert_eq!(stats.chunks_embedded, 3);

    // The persisted pair honors the alignment invariant.
    let index = VectorIndex::load(&options.index_path).expect("index loads");
    let store = ChunkStore::load(&options.chunk_store_path).expect("store loads");
    assert_eq!(index.len(), store.len());

    let llm = CannedLlm;
    let engine = QueryEngine::open(
        &options.index_path,
        &options.chunk_store_path,
        &embedder,
        &llm,
        query_options(),
    )
    .expect("engine opens");

    let outcome = engine
        .ask("tell me about rust ownership", &[])
        .expect("query succeeds");

    let QueryOutcome::Answered { answer, retrieved } = outcome else {
        panic!("expected an answer");
    };
    assert_eq!(answer, "canned answer");
    assert!(!retrieved.is_empty());
    // The rust-related chunks outrank the python one for a rust query.
    assert!(retrieved[0].text.contains("rust"));
}

#[test]
fn keyword_filtered_query_can_come_up_empty() {
    let docs = TempDir::new().expect("should create temp dir");
    let artifacts = TempDir::new().expect("should create temp dir");
    write_corpus(docs.path());

    let embedder = Embedder::new(Box::new(StatsModel), 3);
    let options = build_options(docs.path(), artifacts.path());
    IndexBuilder::new(&embedder, options.clone())
        .run()
        .expect("build succeeds");

    let llm = CannedLlm;
    let engine = QueryEngine::open(
        &options.index_path,
        &options.chunk_store_path,
        &embedder,
        &llm,
        QueryOptions {
            keywords: vec!["haskell".to_string()],
            ..query_options()
        },
    )
    .expect("engine opens");

    let outcome = engine.ask("anything", &[]).expect("query succeeds");
    assert_eq!(outcome, QueryOutcome::NoRelevantChunks);
}

#[test]
fn append_build_grows_artifacts_in_lockstep() {
    let docs_one = TempDir::new().expect("should create temp dir");
    let docs_two = TempDir::new().expect("should create temp dir");
    let artifacts = TempDir::new().expect("should create temp dir");
    fs::write(docs_one.path().join("a.txt"), "rust text one").expect("should write");
    fs::write(docs_two.path().join("b.txt"), "rust text two").expect("should write");

    let embedder = Embedder::new(Box::new(StatsModel), 3);

    IndexBuilder::new(&embedder, build_options(docs_one.path(), artifacts.path()))
        .run()
        .expect("first build succeeds");
    IndexBuilder::new(&embedder, build_options(docs_two.path(), artifacts.path()))
        .run()
        .expect("append build succeeds");

    let index =
        VectorIndex::load(&artifacts.path().join("index.bin")).expect("index loads");
    let store =
        ChunkStore::load(&artifacts.path().join("chunk_store.json")).expect("store loads");
    assert_eq!(index.len(), 2);
    assert_eq!(store.len(), 2);

    // Both runs' chunks are reachable through the query path.
    let llm = CannedLlm;
    let engine = QueryEngine::open(
        &artifacts.path().join("index.bin"),
        &artifacts.path().join("chunk_store.json"),
        &embedder,
        &llm,
        query_options(),
    )
    .expect("engine opens");

    let outcome = engine.ask("rust", &[]).expect("query succeeds");
    let QueryOutcome::Answered { retrieved, .. } = outcome else {
        panic!("expected an answer");
    };
    assert_eq!(retrieved.len(), 2);
}

#[test]
fn interactive_history_flows_into_retrieval() {
    let docs = TempDir::new().expect("should create temp dir");
    let artifacts = TempDir::new().expect("should create temp dir");
    write_corpus(docs.path());

    let embedder = Embedder::new(Box::new(StatsModel), 3);
    let options = build_options(docs.path(), artifacts.path());
    IndexBuilder::new(&embedder, options.clone())
        .run()
        .expect("build succeeds");

    let llm = CannedLlm;
    let engine = QueryEngine::open(
        &options.index_path,
        &options.chunk_store_path,
        &embedder,
        &llm,
        QueryOptions {
            context_turns: 2,
            ..query_options()
        },
    )
    .expect("engine opens");

    // History mentioning rust biases the embedded query toward the rust
    // chunks even though the follow-up question does not name it.
    let history = vec![
        ConversationTurn::user("tell me about rust"),
        ConversationTurn::assistant("rust is a systems language"),
    ];
    let outcome = engine
        .ask("what about its memory model?", &history)
        .expect("query succeeds");

    let QueryOutcome::Answered { retrieved, .. } = outcome else {
        panic!("expected an answer");
    };
    assert!(retrieved[0].text.contains("rust"));
}
