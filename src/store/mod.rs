
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::util::write_atomic;
use crate::{RagError, Result};

/// One chunk of document text plus its provenance. Field names match the
/// on-disk JSON format (`filepath`, `text`), which is order-significant and
/// positionally aligned with the vector index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub filepath: String,
    pub text: String,
}

/// The ordered, append-friendly record of every embedded chunk. Record `i`
/// corresponds to vector index row `i`; this alignment is load-bearing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkStore {
    records: Vec<ChunkRecord>,
}

impl ChunkStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn append(&mut self, record: ChunkRecord) {
        self.records.push(record);
    }

    #[inline]
    pub fn extend<I: IntoIterator<Item = ChunkRecord>>(&mut self, records: I) {
        self.records.extend(records);
    }

    /// Fetch the record aligned with vector row `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Result<&ChunkRecord> {
        self.records
            .get(index)
            .ok_or_else(|| RagError::ChunkOutOfRange {
                index,
                len: self.records.len(),
            })
    }

    #[inline]
    pub fn records(&self) -> &[ChunkRecord] {
        &self.records
    }

    /// Persist the full accumulated record list, wholesale overwriting the
    /// backing file. The write is atomic so a crash never leaves a partial
    /// store behind.
    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_vec_pretty(&self.records).map_err(|e| RagError::StoreCorrupt {
                path: path.to_path_buf(),
                message: format!("serialization failed: {e}"),
            })?;
        write_atomic(path, &json)?;
        info!(
            "Saved chunk store with {} records to {}",
            self.records.len(),
            path.display()
        );
        Ok(())
    }

    /// Load a chunk store from disk. A missing file and an unparseable file
    /// are distinct, fatal errors: no query can proceed without the store.
    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RagError::StoreMissing(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let records: Vec<ChunkRecord> =
            serde_json::from_str(&content).map_err(|e| RagError::StoreCorrupt {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        debug!(
            "Loaded {} chunk records from {}",
            records.len(),
            path.display()
        );
        Ok(Self { records })
    }
}
