use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

mod cli;
mod expand;
mod filter_file;
mod settings;

use cli::Args;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse_from(cli::normalize_flags(std::env::args_os()));

    // Diagnostics go to stderr; stdout carries only sorted lines
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run_app(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app(args: Args) -> Result<()> {
    let config = settings::resolve(args)?;
    tracing::debug!(?config, "resolved configuration");

    ssort_core::run(&config, tokio::io::stdout()).await?;
    Ok(())
}
