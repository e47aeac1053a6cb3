use super::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::embeddings::EmbeddingModel;

/// Deterministic embedding stub: a few cheap text statistics per vector.
/// Raw width 4, so an Embedder with a different target dimension also
/// exercises pad/truncate.
struct StatsModel;

impl EmbeddingModel for StatsModel {
    fn embed_batch(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                vec![
                    t.chars().count() as f32,
                    t.split_whitespace().count() as f32,
                    t.chars().filter(|c| "aeiou".contains(*c)).count() as f32,
                    1.0,
                ]
            })
            .collect())
    }
}

fn test_embedder() -> Embedder {
    Embedder::new(Box::new(StatsModel), 4)
}

fn options_for(dir: &Path, artifacts: &Path) -> BuildOptions {
    BuildOptions {
        input_dir: dir.to_path_buf(),
        index_path: artifacts.join("index.bin"),
        chunk_store_path: artifacts.join("chunk_store.json"),
        method: ChunkingMethod::Paragraph,
        chunk_size: 500,
        overlap: 50,
        rebuild: false,
    }
}

#[test]
fn build_keeps_store_and_index_aligned() {
    let docs = TempDir::new().expect("should create temp dir");
    let artifacts = TempDir::new().expect("should create temp dir");
    fs::write(docs.path().join("a.txt"), "alpha beta\n\ngamma delta").expect("should write");
    fs::write(docs.path().join("b.txt"), "epsilon zeta").expect("should write");

    let embedder = test_embedder();
    let options = options_for(docs.path(), artifacts.path());
    let stats = IndexBuilder::new(&embedder, options.clone())
        .run()
        .expect("build succeeds");

    assert_eq!(stats.files_processed, 2);
    assert_eq!(stats.chunks_embedded, 3);
    assert_eq!(stats.index_len, 3);

    let index = VectorIndex::load(&options.index_path).expect("index exists");
    let store = ChunkStore::load(&options.chunk_store_path).expect("store exists");
    assert_eq!(store.len(), index.len());

    // Files are visited in sorted order, chunks in document order.
    assert_eq!(store.get(0).expect("in range").text, "alpha beta");
    assert_eq!(store.get(1).expect("in range").text, "gamma delta");
    assert_eq!(store.get(2).expect("in range").text, "epsilon zeta");
    assert!(
        store
            .get(2)
            .expect("in range")
            .filepath
            .ends_with("b.txt")
    );
}

#[test]
fn append_run_merges_prior_store() {
    let docs_one = TempDir::new().expect("should create temp dir");
    let docs_two = TempDir::new().expect("should create temp dir");
    let artifacts = TempDir::new().expect("should create temp dir");
    fs::write(docs_one.path().join("a.txt"), "first corpus text").expect("should write");
    fs::write(docs_two.path().join("b.txt"), "second corpus text").expect("should write");

    let embedder = test_embedder();

    let first = options_for(docs_one.path(), artifacts.path());
    IndexBuilder::new(&embedder, first)
        .run()
        .expect("first build succeeds");

    let second = options_for(docs_two.path(), artifacts.path());
    let stats = IndexBuilder::new(&embedder, second.clone())
        .run()
        .expect("append build succeeds");

    assert_eq!(stats.chunks_embedded, 1);
    assert_eq!(stats.index_len, 2);

    // The persisted store must cover both runs, not just the latest one.
    let store = ChunkStore::load(&second.chunk_store_path).expect("store exists");
    let index = VectorIndex::load(&second.index_path).expect("index exists");
    assert_eq!(store.len(), 2);
    assert_eq!(store.len(), index.len());
    assert_eq!(store.get(0).expect("in range").text, "first corpus text");
    assert_eq!(store.get(1).expect("in range").text, "second corpus text");
}

#[test]
fn rebuild_discards_existing_artifacts() {
    let docs = TempDir::new().expect("should create temp dir");
    let artifacts = TempDir::new().expect("should create temp dir");
    fs::write(docs.path().join("a.txt"), "some text").expect("should write");

    let embedder = test_embedder();
    let options = options_for(docs.path(), artifacts.path());

    IndexBuilder::new(&embedder, options.clone())
        .run()
        .expect("first build succeeds");

    let rebuild = BuildOptions {
        rebuild: true,
        ..options
    };
    let stats = IndexBuilder::new(&embedder, rebuild.clone())
        .run()
        .expect("rebuild succeeds");

    assert_eq!(stats.index_len, 1);
    let store = ChunkStore::load(&rebuild.chunk_store_path).expect("store exists");
    assert_eq!(store.len(), 1);
}

#[test]
fn append_without_prior_store_is_rejected() {
    let docs = TempDir::new().expect("should create temp dir");
    let artifacts = TempDir::new().expect("should create temp dir");
    fs::write(docs.path().join("a.txt"), "some text").expect("should write");

    let embedder = test_embedder();
    let options = options_for(docs.path(), artifacts.path());

    IndexBuilder::new(&embedder, options.clone())
        .run()
        .expect("first build succeeds");
    fs::remove_file(&options.chunk_store_path).expect("should remove store");

    let err = IndexBuilder::new(&embedder, options)
        .run()
        .expect_err("append without a store must fail");
    assert!(matches!(err, RagError::StoreMissing(_)));
}

#[test]
fn append_with_misaligned_store_is_rejected() {
    let docs = TempDir::new().expect("should create temp dir");
    let artifacts = TempDir::new().expect("should create temp dir");
    fs::write(docs.path().join("a.txt"), "some text").expect("should write");

    let embedder = test_embedder();
    let options = options_for(docs.path(), artifacts.path());

    IndexBuilder::new(&embedder, options.clone())
        .run()
        .expect("first build succeeds");

    // Tamper with the store so its length no longer matches the index.
    let mut store = ChunkStore::load(&options.chunk_store_path).expect("store exists");
    store.append(crate::store::ChunkRecord {
        filepath: "fake.txt".to_string(),
        text: "orphan record".to_string(),
    });
    store.save(&options.chunk_store_path).expect("save succeeds");

    let err = IndexBuilder::new(&embedder, options)
        .run()
        .expect_err("misaligned pair must be rejected");
    assert!(matches!(err, RagError::Misaligned { .. }));
}

#[test]
fn missing_input_dir_is_fatal() {
    let artifacts = TempDir::new().expect("should create temp dir");
    let embedder = test_embedder();
    let options = options_for(Path::new("/nonexistent/dir"), artifacts.path());

    let err = IndexBuilder::new(&embedder, options)
        .run()
        .expect_err("missing input dir must fail");
    assert!(matches!(err, RagError::InputDirMissing(_)));
}

#[test]
fn empty_corpus_writes_nothing() {
    let docs = TempDir::new().expect("should create temp dir");
    let artifacts = TempDir::new().expect("should create temp dir");
    // Only an unsupported file that extracts to empty text.
    fs::write(docs.path().join("image.png"), [0_u8, 1, 2]).expect("should write");

    let embedder = test_embedder();
    let options = options_for(docs.path(), artifacts.path());

    let err = IndexBuilder::new(&embedder, options.clone())
        .run()
        .expect_err("empty corpus must fail");
    assert!(matches!(err, RagError::EmptyCorpus(_)));
    assert!(!options.index_path.exists());
    assert!(!options.chunk_store_path.exists());
}

#[test]
fn unreadable_files_are_skipped_not_fatal() {
    let docs = TempDir::new().expect("should create temp dir");
    let artifacts = TempDir::new().expect("should create temp dir");
    fs::write(docs.path().join("good.txt"), "usable text").expect("should write");
    // Invalid UTF-8 in a .txt file fails extraction for that file only.
    fs::write(docs.path().join("bad.txt"), [0xFF_u8, 0xFE, 0x00]).expect("should write");

    let embedder = test_embedder();
    let options = options_for(docs.path(), artifacts.path());
    let stats = IndexBuilder::new(&embedder, options)
        .run()
        .expect("build succeeds despite the bad file");

    assert_eq!(stats.files_processed, 1);
    assert_eq!(stats.files_skipped, 1);
    assert_eq!(stats.index_len, 1);
}

#[test]
fn character_mode_build_respects_chunk_parameters() {
    let docs = TempDir::new().expect("should create temp dir");
    let artifacts = TempDir::new().expect("should create temp dir");
    let text: String = "x".repeat(100);
    fs::write(docs.path().join("a.txt"), &text).expect("should write");

    let embedder = test_embedder();
    let options = BuildOptions {
        method: ChunkingMethod::Character,
        chunk_size: 40,
        overlap: 10,
        ..options_for(docs.path(), artifacts.path())
    };

    let stats = IndexBuilder::new(&embedder, options.clone())
        .run()
        .expect("build succeeds");

    // ceil((100 - 10) / 30) = 3 chunks.
    assert_eq!(stats.chunks_embedded, 3);
    let store = ChunkStore::load(&options.chunk_store_path).expect("store exists");
    assert!(
        store
            .records()
            .iter()
            .all(|r| r.text.chars().count() <= 40)
    );
}
