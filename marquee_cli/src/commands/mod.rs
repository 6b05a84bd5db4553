pub mod check;
pub mod config;
pub mod links;
pub mod search;
pub mod sources;

use crate::cli::{Cli, HealthArgs, OutputFormat};
use indicatif::{ProgressBar, ProgressStyle};
use marquee_core::{ConfigStore, CoreError, EngineConfig, HealthOptions, SourceError};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No sources have a search URL. Run `marquee sources set-url <id> --search-url <url>`")]
    NoSearchableSources,

    #[error("Source '{0}' has no search URL. Run `marquee sources set-url {0} --search-url <url>`")]
    SourceNotSearchable(String),

    #[error("All {0} queried sources failed")]
    AllSourcesFailed(usize),

    #[error("{0}")]
    Source(#[from] SourceError),

    #[error("Core library error: {0}")]
    Core(#[from] CoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CommandError {
    /// Short code printed next to the message, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::InvalidInput(_) => "invalid_input",
            CommandError::NoSearchableSources => "no_searchable_sources",
            CommandError::SourceNotSearchable(_) => "source_not_searchable",
            CommandError::AllSourcesFailed(_) => "all_sources_failed",
            CommandError::Source(err) => err.kind.as_str(),
            CommandError::Core(err) => err.code_str(),
            CommandError::Serialization(_) | CommandError::Yaml(_) => "serialization",
            CommandError::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, CommandError>;

pub fn config_store(cli: &Cli) -> ConfigStore {
    match &cli.config_path {
        Some(path) => ConfigStore::new(path.clone()),
        None => ConfigStore::new_default(),
    }
}

pub fn load_config(cli: &Cli) -> Result<EngineConfig> {
    Ok(config_store(cli).load()?)
}

/// Spinner on stderr; hidden for machine-readable output.
pub fn spinner(cli: &Cli, message: String) -> ProgressBar {
    if cli.output != OutputFormat::Pretty {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Configured health options with command-line overrides applied.
pub fn health_options(config: &EngineConfig, args: &HealthArgs) -> HealthOptions {
    let mut options = config.health_options();
    if !args.trusted.is_empty() {
        options = options.with_trusted_hosts(args.trusted.clone());
    }
    if let Some(limit) = args.concurrency {
        options = options.with_concurrency(limit);
    }
    if let Some(ms) = args.timeout_ms {
        options = options.with_timeout(Duration::from_millis(ms));
    }
    options
}

/// Split a comma-separated list, dropping blanks.
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
