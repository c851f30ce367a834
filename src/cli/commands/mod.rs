mod ask;
mod chat;
mod config;
mod search;

pub use ask::AskArgs;
pub use chat::ChatArgs;
pub use config::ConfigCommand;
pub use search::SearchArgs;

pub use ask::handle_ask;
pub use chat::{chat_loop, handle_chat};
pub use config::handle_config;
pub use search::handle_search;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::cli::output::Formatter;
use crate::models::Config;
use crate::services::RetrievalPipeline;
use crate::sources::load_documents;

/// Build a pipeline and index the documents under `docs`, if given.
///
/// Indexing stats are written to stderr when `verbose` is set.
pub(crate) async fn prepare_pipeline(
    config: &Config,
    docs: Option<&Path>,
    formatter: &dyn Formatter,
    verbose: bool,
) -> Result<RetrievalPipeline> {
    let pipeline = RetrievalPipeline::new(config).context("failed to initialize pipeline")?;

    let Some(path) = docs else {
        return Ok(pipeline);
    };

    let start = Instant::now();
    let documents = load_documents(path, config.chunking.max_file_size)
        .with_context(|| format!("failed to load documents from {}", path.display()))?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    pb.set_message(format!("Indexing {} documents...", documents.len()));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = pipeline.index_documents(&documents).await;
    pb.finish_and_clear();
    let stats = result.context("failed to index documents")?;

    if verbose {
        let duration_ms = start.elapsed().as_millis() as u64;
        eprint!("{}", formatter.format_index_stats(&stats, duration_ms));
    }

    Ok(pipeline)
}
