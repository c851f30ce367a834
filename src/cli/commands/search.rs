use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::time::Instant;

use super::prepare_pipeline;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(required = true, help = "Search query text")]
    pub query: String,

    #[arg(long, short = 'd', help = "Document file or directory to index")]
    pub docs: PathBuf,

    #[arg(long, short = 'n', help = "Maximum number of results to return")]
    pub limit: Option<usize>,
}

pub async fn handle_search(args: SearchArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let query = args.query.trim();
    if query.is_empty() {
        anyhow::bail!("search query cannot be empty");
    }

    let mut config = Config::load()?;
    if let Some(limit) = args.limit {
        if limit == 0 {
            anyhow::bail!("limit must be at least 1");
        }
        config.retrieval.top_k = limit;
    }

    let formatter = get_formatter(format);
    let pipeline = prepare_pipeline(&config, Some(&args.docs), formatter.as_ref(), verbose).await?;

    let search_start = Instant::now();
    let outcome = pipeline.query(query).await?;

    if verbose {
        eprintln!("Query: \"{}\"", outcome.query);
        eprintln!("  Limit: {}", pipeline.top_k());
        eprintln!("  Search: {}ms", search_start.elapsed().as_millis());
        eprintln!();
    }

    print!("{}", formatter.format_retrieval(&outcome));
    Ok(())
}
