use anyhow::Result;
use clap::Args;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use super::prepare_pipeline;
use crate::cli::output::get_formatter;
use crate::error::AppError;
use crate::models::{Config, OutputFormat};
use crate::services::{Generator, RetrievalPipeline, create_generator};

const QUIT_COMMANDS: &[&str] = &["quit", "exit", "q"];

#[derive(Debug, Args)]
pub struct ChatArgs {
    #[arg(long, short = 'd', help = "Document file or directory to index before chatting")]
    pub docs: Option<PathBuf>,
}

pub async fn handle_chat(args: ChatArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let pipeline =
        prepare_pipeline(&config, args.docs.as_deref(), formatter.as_ref(), verbose).await?;
    let generator = create_generator(&config.chat)?;

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    chat_loop(&pipeline, generator.as_ref(), stdin, &mut stdout).await
}

/// Read questions line by line and answer each until a quit command or EOF.
///
/// Failed turns are reported and the loop keeps going.
pub async fn chat_loop<R, W>(
    pipeline: &RetrievalPipeline,
    generator: &dyn Generator,
    input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    tracing::info!(generator = generator.name(), "starting chat");
    writeln!(out, "ragline chat")?;
    writeln!(out, "Type 'quit' to exit\n")?;

    if !pipeline.is_indexed().await {
        writeln!(
            out,
            "Warning: No documents indexed. Questions will fail until documents are indexed with --docs."
        )?;
    }

    let mut lines = input.lines();
    loop {
        write!(out, "You: ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out, "\nGoodbye!")?;
            break;
        };

        let line = line.trim();
        if QUIT_COMMANDS.contains(&line.to_lowercase().as_str()) {
            writeln!(out, "Goodbye!")?;
            break;
        }
        if line.is_empty() {
            continue;
        }

        match answer(pipeline, generator, line).await {
            Ok(reply) => writeln!(out, "Assistant: {reply}\n")?,
            Err(e) => {
                tracing::error!(error = %e, "chat turn failed");
                writeln!(out, "Error: {e}")?;
            }
        }
    }

    Ok(())
}

async fn answer(
    pipeline: &RetrievalPipeline,
    generator: &dyn Generator,
    question: &str,
) -> Result<String, AppError> {
    let outcome = pipeline.query(question).await?;
    Ok(generator.generate(&outcome.query, &outcome.context).await?)
}
