use anyhow::Result;
use clap::Parser;
use std::future::Future;
use std::io::Write;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use ragline::cli::commands::{handle_ask, handle_chat, handle_config, handle_search};
use ragline::cli::output::get_formatter;
use ragline::cli::{Cli, Commands};
use ragline::models::{Config, OutputFormat};

/// Environment variable holding the tracing filter directives.
const LOG_ENV: &str = "RAGLINE_LOG";

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "ragline=debug" } else { "ragline=info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let format = cli
        .format
        .unwrap_or_else(|| Config::load().map(|c| c.retrieval.default_format).unwrap_or_default());
    let verbose = cli.verbose;

    match run_until_shutdown(run_command(cli.command, format, verbose), shutdown_signal()).await {
        Ok(RunOutcome::Completed) => Ok(()),
        Ok(RunOutcome::Interrupted) => {
            let _ = std::io::stdout().flush();
            eprintln!("\nGoodbye!");
            // A pending stdin read would otherwise block runtime shutdown.
            std::process::exit(0);
        }
        Err(e) => {
            eprint!("{}", get_formatter(format).format_error(&format!("{e:#}")));
            std::process::exit(1);
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum RunOutcome {
    Completed,
    Interrupted,
}

/// Drive `work` until it finishes or `shutdown` resolves first.
async fn run_until_shutdown<W, S>(work: W, shutdown: S) -> Result<RunOutcome>
where
    W: Future<Output = Result<()>>,
    S: Future<Output = ()>,
{
    tokio::select! {
        result = work => result.map(|()| RunOutcome::Completed),
        _ = shutdown => Ok(RunOutcome::Interrupted),
    }
}

async fn run_command(command: Commands, format: OutputFormat, verbose: bool) -> Result<()> {
    match command {
        Commands::Chat(args) => {
            handle_chat(args, format, verbose).await?;
        }
        Commands::Ask(args) => {
            handle_ask(args, format, verbose).await?;
        }
        Commands::Search(args) => {
            handle_search(args, format, verbose).await?;
        }
        Commands::Config(cmd) => {
            handle_config(cmd, format, verbose).await?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
