use clap::Parser;
use owo_colors::OwoColorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};
use commands::*;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so that --output json stays machine-readable.
    let default_filter = match cli.verbose {
        0 => "marquee=warn,marquee_cli=info",
        1 => "marquee=debug,marquee_cli=debug",
        _ => "marquee=trace,marquee_cli=trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match &cli.command {
        Commands::Search(args) => search::run(&cli, args).await,
        Commands::Links {
            source,
            page_ref,
            health,
        } => links::run(&cli, source, page_ref, health).await,
        Commands::Check { input, health } => check::run(&cli, input, health).await,
        Commands::Sources { action } => sources::run(&cli, action.clone()),
        Commands::Config { action } => config::run(&cli, action.clone()),
    };

    if let Err(e) = result {
        eprintln!("{} {}: {}", "Error".red().bold(), format!("[{}]", e.code()).dimmed(), e);
        process::exit(1);
    }
}
