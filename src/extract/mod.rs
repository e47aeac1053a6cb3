
use std::fs;
use std::path::Path;

use itertools::Itertools;
use tracing::{debug, warn};

use crate::{RagError, Result};

/// Extract plain text from a document on disk.
///
/// Supports `.txt`/`.md` (read as UTF-8) and `.pdf` (text layer only; scanned
/// PDFs with no text layer come back empty and the caller skips them, OCR is
/// an external concern). Unsupported extensions yield empty text so the
/// caller can skip the file rather than abort the build.
#[inline]
pub fn extract_text(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let raw = match extension.as_str() {
        "txt" | "md" | "text" => fs::read_to_string(path).map_err(|e| RagError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?,
        "pdf" => pdf_extract::extract_text(path).map_err(|e| RagError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?,
        _ => {
            warn!("Unsupported file type {:?}: {}", extension, path.display());
            return Ok(String::new());
        }
    };

    let normalized = normalize_whitespace(&raw);
    debug!(
        "Extracted {} characters from {}",
        normalized.chars().count(),
        path.display()
    );
    Ok(normalized)
}

/// Collapse runs of whitespace within each paragraph to single spaces while
/// preserving blank-line paragraph boundaries as `"\n\n"`, so paragraph-mode
/// chunking still sees them.
#[inline]
pub fn normalize_whitespace(text: &str) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line.split_whitespace().join(" "));
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs.join("\n\n")
}
