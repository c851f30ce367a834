//! Command-line interface for ragline.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Retrieval-augmented question answering over local text documents.
#[derive(Debug, Parser)]
#[command(name = "ragline")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Interactive question answering over indexed documents
    Chat(commands::ChatArgs),

    /// Answer a single question
    Ask(commands::AskArgs),

    /// Show the passages retrieved for a query
    Search(commands::SearchArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
