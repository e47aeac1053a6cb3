use std::fs;
use std::path::Path;

use crate::Result;

/// Write `bytes` to `path` via a sibling temp file and rename, so a crash
/// mid-write never leaves a partially written artifact at `path`.
#[inline]
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_new_file() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let path = temp_dir.path().join("out.bin");
        write_atomic(&path, b"hello").expect("should write");
        assert_eq!(fs::read(&path).expect("should read"), b"hello");
    }

    #[test]
    fn replaces_existing_file() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let path = temp_dir.path().join("out.bin");
        fs::write(&path, b"old contents").expect("should write");
        write_atomic(&path, b"new").expect("should write");
        assert_eq!(fs::read(&path).expect("should read"), b"new");
    }

    #[test]
    fn creates_missing_parent_directories() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let path = temp_dir.path().join("nested/dir/out.bin");
        write_atomic(&path, b"data").expect("should write");
        assert_eq!(fs::read(&path).expect("should read"), b"data");
    }

    #[test]
    fn leaves_no_temp_file_behind() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let path = temp_dir.path().join("out.bin");
        write_atomic(&path, b"data").expect("should write");

        let entries: Vec<_> = fs::read_dir(temp_dir.path())
            .expect("should list dir")
            .collect();
        assert_eq!(entries.len(), 1);
    }
}
