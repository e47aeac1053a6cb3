use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input directory not found or not a directory: {0}")]
    InputDirMissing(PathBuf),

    #[error("Failed to parse document {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("No chunks extracted from any document in {0}")]
    EmptyCorpus(PathBuf),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector index not found: {0}")]
    IndexMissing(PathBuf),

    #[error("Vector index at {path} is corrupt: {message}")]
    IndexCorrupt { path: PathBuf, message: String },

    #[error("Chunk store not found: {0}")]
    StoreMissing(PathBuf),

    #[error("Chunk store at {path} is corrupt: {message}")]
    StoreCorrupt { path: PathBuf, message: String },

    #[error("Chunk index {index} out of range (store holds {len} records)")]
    ChunkOutOfRange { index: usize, len: usize },

    #[error(
        "Chunk store and vector index are misaligned: {store_len} records vs {index_len} vectors"
    )]
    Misaligned { store_len: usize, index_len: usize },

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chunking;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod extract;
pub mod indexer;
pub mod query;
pub mod store;
pub mod util;
pub mod vector;
