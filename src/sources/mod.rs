//! Document sources.
//!
//! Sources produce raw document text; chunking and embedding happen in the
//! pipeline.

mod local;

pub use local::LocalSource;

use std::path::Path;

use crate::error::SourceError;

/// Load every document under `path` using the local file system source.
pub fn load_documents(path: &Path, max_file_size: u64) -> Result<Vec<String>, SourceError> {
    LocalSource::new(path.to_path_buf(), max_file_size).load()
}
