
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::util::write_atomic;
use crate::{RagError, Result};

/// A flat, exact-L2 nearest-neighbor index over fixed-dimension vectors.
///
/// No approximation or clustering: every search scans all rows, which is the
/// right trade-off for the corpus sizes this pipeline targets (thousands of
/// chunks, not millions). Rows are append-only within a build session and
/// positionally aligned 1:1 with chunk store records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    dimension: usize,
    /// Row-major storage; row `i` occupies `data[i*dimension..(i+1)*dimension]`.
    data: Vec<f32>,
}

/// One nearest-neighbor search result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Positional row index, shared with the chunk store.
    pub index: usize,
    /// Squared L2 distance to the query vector (FAISS flat-index convention).
    pub distance: f32,
}

impl VectorIndex {
    /// Create an empty index over vectors of exactly `dimension` components.
    #[inline]
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::Config(
                "vector index dimension must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append rows to the index. Every row must have exactly the index's
    /// dimension; a mismatched row aborts the whole add with nothing
    /// appended, never a silent reshape.
    #[inline]
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        for vector in vectors {
            if vector.len() != self.dimension {
                return Err(RagError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }

        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }

        debug!(
            "Added {} vectors to index (now {} rows)",
            vectors.len(),
            self.len()
        );
        Ok(())
    }

    /// Return the `k` nearest rows to `query` by ascending squared-L2
    /// distance. Ties break toward the lower row index (first inserted wins).
    /// A `k` larger than the index returns every row without error.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut hits: Vec<SearchHit> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(index, row)| SearchHit {
                index,
                distance: squared_l2(row, query),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.index.cmp(&b.index))
        });
        hits.truncate(k.min(self.len()));

        Ok(hits)
    }

    /// Persist the index. The write is atomic: a crash mid-save leaves the
    /// previous index intact.
    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = bincode::serialize(self).map_err(|e| RagError::IndexCorrupt {
            path: path.to_path_buf(),
            message: format!("serialization failed: {e}"),
        })?;
        write_atomic(path, &bytes)?;
        info!("Saved vector index with {} rows to {}", self.len(), path.display());
        Ok(())
    }

    /// Load a previously saved index. Searches against the reloaded index
    /// return the same results as against the pre-save in-memory index.
    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RagError::IndexMissing(path.to_path_buf()));
        }

        let bytes = fs::read(path)?;
        let index: Self = bincode::deserialize(&bytes).map_err(|e| RagError::IndexCorrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if index.dimension == 0 || index.data.len() % index.dimension != 0 {
            return Err(RagError::IndexCorrupt {
                path: path.to_path_buf(),
                message: format!(
                    "stored data length {} is not a multiple of dimension {}",
                    index.data.len(),
                    index.dimension
                ),
            });
        }

        debug!(
            "Loaded vector index with {} rows (dimension {}) from {}",
            index.len(),
            index.dimension,
            path.display()
        );
        Ok(index)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
