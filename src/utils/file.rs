//! File helpers for document loading.

use std::fs;
use std::path::Path;

/// Extensions treated as plain-text documents when scanning a directory.
const DOCUMENT_EXTENSIONS: &[&str] = &["txt"];

/// Check whether a path names a plain-text document by its extension.
pub fn is_document_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext.as_str()))
}

/// Read file content with size limit.
pub fn read_file_content(path: &Path, max_size: u64) -> std::io::Result<String> {
    let metadata = fs::metadata(path)?;

    if metadata.len() > max_size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "file exceeds maximum size: {} > {}",
                metadata.len(),
                max_size
            ),
        ));
    }

    fs::read_to_string(path)
}
