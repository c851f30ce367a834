use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use super::prepare_pipeline;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::create_generator;

#[derive(Debug, Args)]
pub struct AskArgs {
    #[arg(required = true, help = "Question to answer")]
    pub question: String,

    #[arg(long, short = 'd', help = "Document file or directory to index")]
    pub docs: PathBuf,
}

pub async fn handle_ask(args: AskArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let question = args.question.trim();
    if question.is_empty() {
        anyhow::bail!("question cannot be empty");
    }

    let config = Config::load()?;
    let formatter = get_formatter(format);

    let pipeline = prepare_pipeline(&config, Some(&args.docs), formatter.as_ref(), verbose).await?;
    let generator = create_generator(&config.chat)?;

    let outcome = pipeline.query(question).await?;
    if verbose {
        eprintln!("Query: \"{}\"", outcome.query);
        eprintln!("  Retrieved: {}", outcome.len());
        eprintln!("  Generator: {}", generator.name());
        eprintln!();
    }

    let answer = generator
        .generate(&outcome.query, &outcome.context)
        .await
        .context("failed to generate answer")?;

    print!("{}", formatter.format_answer(&answer, &outcome));
    Ok(())
}
