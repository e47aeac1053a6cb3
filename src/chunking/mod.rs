
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{RagError, Result};

/// How document text is split into retrieval units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingMethod {
    /// Fixed-size character windows with configurable overlap.
    Character,
    /// One chunk per blank-line-delimited paragraph, no size bound.
    Paragraph,
}

/// Split text into overlapping windows of at most `size` characters.
///
/// Windows start at 0 and step by `size - overlap`; consecutive chunks from
/// the same text share exactly `overlap` characters. The final window may be
/// shorter than `size`. Operates on characters, not bytes, so multi-byte
/// UTF-8 never splits.
#[inline]
pub fn chunk_by_characters(text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
    if size == 0 {
        return Err(RagError::Config(
            "chunk size must be at least 1".to_string(),
        ));
    }
    if overlap >= size {
        // A step of zero would loop forever; reject rather than clamp.
        return Err(RagError::Config(format!(
            "overlap ({overlap}) must be smaller than chunk size ({size})"
        )));
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Ok(Vec::new());
    }

    let step = size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(chunks)
}

/// Split text on blank-line boundaries. Whitespace-only paragraphs are
/// dropped; paragraph length is not bounded.
#[inline]
pub fn chunk_by_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Chunk `text` according to `method`.
#[inline]
pub fn chunk_text(
    text: &str,
    method: ChunkingMethod,
    size: usize,
    overlap: usize,
) -> Result<Vec<String>> {
    match method {
        ChunkingMethod::Character => chunk_by_characters(text, size, overlap),
        ChunkingMethod::Paragraph => Ok(chunk_by_paragraphs(text)),
    }
}
