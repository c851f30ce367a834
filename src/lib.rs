pub mod cli;
pub mod error;
pub mod models;
pub mod services;
pub mod sources;
pub mod utils;

pub use cli::{Cli, Commands};
pub use error::AppError;
pub use models::{Config, OutputFormat};
pub use services::{RetrievalPipeline, format_context};
