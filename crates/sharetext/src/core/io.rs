//! File I/O utilities.

use crate::{Result, SharetextError};
use std::path::Path;

/// Read a whole file into memory.
///
/// # Errors
///
/// - `SharetextError::FileNotFound` if the path does not exist
/// - `SharetextError::Validation` if the file exceeds `max_size` bytes
/// - `SharetextError::Io` for every other I/O failure (these always bubble up)
pub fn read_file_bytes(path: impl AsRef<Path>, max_size: Option<u64>) -> Result<Vec<u8>> {
    let path = path.as_ref();

    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SharetextError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => SharetextError::Io(e),
    })?;

    if metadata.is_dir() {
        return Err(SharetextError::validation(format!(
            "Expected a file but found a directory: {}",
            path.display()
        )));
    }

    if let Some(limit) = max_size
        && metadata.len() > limit
    {
        return Err(SharetextError::validation(format!(
            "File {} is {} bytes, above the configured limit of {} bytes",
            path.display(),
            metadata.len(),
            limit
        )));
    }

    std::fs::read(path).map_err(SharetextError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_read_file_bytes() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.txt");
        fs::write(&file_path, b"test content").unwrap();

        let result = read_file_bytes(&file_path, None).unwrap();
        assert_eq!(result, b"test content");
    }

    #[test]
    fn test_missing_file_is_file_not_found() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.docx");
        let err = read_file_bytes(&missing, None).unwrap_err();
        assert!(matches!(err, SharetextError::FileNotFound { ref path } if path == &missing));
    }

    #[test]
    fn test_size_limit() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("big.txt");
        fs::write(&file_path, vec![b'a'; 64]).unwrap();

        assert!(read_file_bytes(&file_path, Some(64)).is_ok());
        let err = read_file_bytes(&file_path, Some(63)).unwrap_err();
        assert!(matches!(err, SharetextError::Validation { .. }));
    }

    #[test]
    fn test_directory_rejected() {
        let dir = tempdir().unwrap();
        let err = read_file_bytes(dir.path(), None).unwrap_err();
        assert!(matches!(err, SharetextError::Validation { .. }));
    }
}
