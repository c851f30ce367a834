//! Utility modules.

pub mod file;
pub mod retry;

pub use file::{is_document_file, read_file_content};
pub use retry::{RetryConfig, Retryable, with_retry};
