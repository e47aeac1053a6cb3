#[cfg(test)]
mod tests;

use std::fs;
use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::chunking::{ChunkingMethod, chunk_text};
use crate::embeddings::Embedder;
use crate::extract::extract_text;
use crate::store::{ChunkRecord, ChunkStore};
use crate::vector::VectorIndex;
use crate::{RagError, Result};

/// Everything a build run needs to know, resolved from config + CLI flags
/// before the builder is constructed.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub input_dir: PathBuf,
    pub index_path: PathBuf,
    pub chunk_store_path: PathBuf,
    pub method: ChunkingMethod,
    pub chunk_size: usize,
    pub overlap: usize,
    /// Start from scratch even when an index already exists at the target
    /// path, instead of appending to it.
    pub rebuild: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub files_processed: usize,
    pub files_skipped: usize,
    pub chunks_embedded: usize,
    /// Total rows in the index after the build (including pre-existing rows
    /// in append mode).
    pub index_len: usize,
}

/// Walks a document directory, chunks and embeds its contents, and keeps the
/// vector index and chunk store persisted together in positional alignment.
pub struct IndexBuilder<'a> {
    embedder: &'a Embedder,
    options: BuildOptions,
}

impl<'a> IndexBuilder<'a> {
    #[inline]
    pub fn new(embedder: &'a Embedder, options: BuildOptions) -> Self {
        Self { embedder, options }
    }

    /// Run a full build. Per-file parse failures are logged and skipped;
    /// failures in the embedding or indexing stages abort the run with no
    /// artifact written.
    #[inline]
    pub fn run(&self) -> Result<BuildStats> {
        let input_dir = &self.options.input_dir;
        if !input_dir.is_dir() {
            return Err(RagError::InputDirMissing(input_dir.clone()));
        }

        let files = self.enumerate_files()?;
        info!(
            "Building index from {} files in {}",
            files.len(),
            input_dir.display()
        );

        let mut stats = BuildStats::default();
        let mut records: Vec<ChunkRecord> = Vec::new();

        let progress = ProgressBar::new(files.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{msg:20} [{bar:40}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress.set_message("chunking");

        for path in &files {
            progress.inc(1);

            let text = match extract_text(path) {
                Ok(text) => text,
                Err(e) => {
                    // Per-document failures never abort the whole build.
                    warn!("Skipping {}: {e}", path.display());
                    stats.files_skipped += 1;
                    continue;
                }
            };

            if text.is_empty() {
                warn!("Skipping {}: no text extracted", path.display());
                stats.files_skipped += 1;
                continue;
            }

            let chunks = chunk_text(
                &text,
                self.options.method,
                self.options.chunk_size,
                self.options.overlap,
            )?;
            info!("Extracted {} chunks from {}", chunks.len(), path.display());

            let filepath = path.to_string_lossy().into_owned();
            records.extend(chunks.into_iter().map(|text| ChunkRecord {
                filepath: filepath.clone(),
                text,
            }));
            stats.files_processed += 1;
        }
        progress.finish_and_clear();

        if records.is_empty() {
            return Err(RagError::EmptyCorpus(input_dir.clone()));
        }

        info!("Embedding {} chunks...", records.len());
        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;
        stats.chunks_embedded = embeddings.len();

        let (mut index, mut store) = self.load_or_create_artifacts()?;

        index.add(&embeddings)?;
        store.extend(records);

        // The positional alignment is the contract everything downstream
        // depends on; re-verify it before anything touches disk.
        if store.len() != index.len() {
            return Err(RagError::Misaligned {
                store_len: store.len(),
                index_len: index.len(),
            });
        }

        index.save(&self.options.index_path)?;
        store.save(&self.options.chunk_store_path)?;

        stats.index_len = index.len();
        info!(
            "Build complete: {} files, {} chunks embedded, index now holds {} vectors",
            stats.files_processed, stats.chunks_embedded, stats.index_len
        );
        Ok(stats)
    }

    /// Regular files in the input directory, non-recursive, sorted by name so
    /// chunk order (and therefore index row order) is deterministic.
    fn enumerate_files(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.options.input_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_type()
                    .map(|file_type| file_type.is_file())
                    .unwrap_or(false)
            })
            .map(|entry| entry.path())
            .collect();
        files.sort();
        Ok(files)
    }

    /// Decide between a fresh build and appending to an existing index.
    ///
    /// Appending requires the prior chunk store to be present and aligned
    /// with the prior index; it is reloaded and merged so the persisted store
    /// always covers every vector, not just this run's. A mismatched pair is
    /// rejected rather than silently re-broken.
    fn load_or_create_artifacts(&self) -> Result<(VectorIndex, ChunkStore)> {
        if self.options.rebuild || !self.options.index_path.exists() {
            let index = VectorIndex::new(self.embedder.dimension())?;
            return Ok((index, ChunkStore::new()));
        }

        info!(
            "Loading existing index from {} for append",
            self.options.index_path.display()
        );
        let index = VectorIndex::load(&self.options.index_path)?;

        if index.dimension() != self.embedder.dimension() {
            return Err(RagError::DimensionMismatch {
                expected: index.dimension(),
                actual: self.embedder.dimension(),
            });
        }

        let store = ChunkStore::load(&self.options.chunk_store_path)?;
        if store.len() != index.len() {
            return Err(RagError::Misaligned {
                store_len: store.len(),
                index_len: index.len(),
            });
        }

        Ok((index, store))
    }
}
