//! Local file system data source.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::SourceError;
use crate::utils::file::{is_document_file, read_file_content};

/// Local file system data source.
#[derive(Debug)]
pub struct LocalSource {
    /// File or directory to read
    root: PathBuf,

    /// Maximum file size
    max_file_size: u64,
}

impl LocalSource {
    /// Create a new local source.
    pub fn new(root: PathBuf, max_file_size: u64) -> Self {
        Self {
            root,
            max_file_size,
        }
    }

    /// Collect the files this source will read.
    ///
    /// A file root is returned as-is. For a directory, only `.txt` files
    /// directly inside it are collected, sorted by file name.
    pub fn collect_files(&self) -> Result<Vec<PathBuf>, SourceError> {
        if !self.root.exists() {
            return Err(SourceError::DocumentNotFound(self.root.clone()));
        }

        if self.root.is_file() {
            return Ok(vec![self.root.clone()]);
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .follow_links(false)
        {
            let entry = entry.map_err(|e| SourceError::WalkError(e.to_string()))?;
            let path = entry.path();

            if path.is_file() && is_document_file(path) {
                files.push(path.to_path_buf());
            }
        }

        Ok(files)
    }

    /// Read every collected file into a document string.
    pub fn load(&self) -> Result<Vec<String>, SourceError> {
        let files = self.collect_files()?;

        let documents = files
            .iter()
            .map(|path| self.read_document(path))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            path = %self.root.display(),
            documents = documents.len(),
            "loaded documents"
        );
        Ok(documents)
    }

    fn read_document(&self, path: &Path) -> Result<String, SourceError> {
        read_file_content(path, self.max_file_size).map_err(|source| SourceError::ReadError {
            path: path.to_path_buf(),
            source,
        })
    }
}
