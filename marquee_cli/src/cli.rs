use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "marquee")]
#[command(about = "Marquee - federated movie search and download link health checks")]
#[command(version)]
#[command(after_help = "\x1b[1;36mQuick Start:\x1b[0m
  marquee sources list                    Show configured sources
  marquee sources set-url moviezwap --search-url \"https://api.example/search?q={query}\"
  marquee search \"Pushpa 2\" --year 2024   Search every enabled source
  marquee links moviezwap <page_ref>      Extract and health-check download links

\x1b[1;36mMore Info:\x1b[0m
  marquee <command> --help                Get help for any command
  marquee config path                     Where settings are stored")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Config file (defaults to ~/.config/marquee/config.yaml)
    #[arg(long = "config", id = "config_path", global = true, env = "MARQUEE_CONFIG")]
    pub config_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search every enabled source for a movie
    ///
    /// Results from different sources that describe the same movie are merged
    /// and ranked by how closely they match the title.
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  marquee search \"Kalki 2898 AD\"
  marquee search \"Leo\" --year 2023 --language tamil
  marquee search \"Animal\" -s moviezwap,skysetx --budget 5
  marquee search \"Salaar\" --output json")]
    Search(SearchArgs),

    /// Extract download links from a result page and check their health
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  marquee links moviezwap https://moviezwap.example/movie/leo-2023
  marquee links skysetx /movie/123 --trusted gofile.io --concurrency 4")]
    Links {
        /// Source that produced the result page
        source: String,
        /// Page reference from a search result
        page_ref: String,
        #[command(flatten)]
        health: HealthArgs,
    },

    /// Check the health of links listed in a JSON file
    ///
    /// The file holds an array of URLs or link objects
    /// ({"url": ..., "host": ..., "quality": ..., "size": ...}).
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  marquee check links.json
  echo '[\"https://gofile.io/d/abc\"]' | marquee check -")]
    Check {
        /// JSON file, or - for stdin
        input: String,
        #[command(flatten)]
        health: HealthArgs,
    },

    /// Manage configured sources
    #[command(alias = "src")]
    Sources {
        #[command(subcommand)]
        action: SourcesAction,
    },

    /// Inspect the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Clone, Debug)]
pub struct SearchArgs {
    /// Movie title to search for
    pub title: String,

    /// Release year
    #[arg(short, long)]
    pub year: Option<u16>,

    /// Language filter (hindi, english, tamil, telugu, ...)
    #[arg(short, long)]
    pub language: Option<String>,

    /// Quality filter (4k, 1080p, 720p, 480p)
    #[arg(short, long)]
    pub quality: Option<String>,

    /// Comma-separated list of sources to query (defaults to all enabled)
    #[arg(short = 's', long = "sources")]
    pub sources: Option<String>,

    /// Maximum number of results
    #[arg(short, long)]
    pub budget: Option<usize>,

    /// Per-source timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Overall deadline in milliseconds
    #[arg(long)]
    pub deadline_ms: Option<u64>,
}

#[derive(Args, Clone, Debug, Default)]
pub struct HealthArgs {
    /// Trusted host (repeatable); replaces the configured list
    #[arg(long = "trusted")]
    pub trusted: Vec<String>,

    /// Maximum simultaneous probes
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-link timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

#[derive(Subcommand, Clone)]
pub enum SourcesAction {
    /// List configured sources
    #[command(alias = "ls")]
    List,
    /// Enable a source
    Enable {
        /// Source id
        id: String,
    },
    /// Disable a source
    Disable {
        /// Source id
        id: String,
    },
    /// Enable every source
    EnableAll,
    /// Disable every source
    DisableAll,
    /// Set a source's endpoints
    SetUrl {
        /// Source id
        id: String,
        /// Search endpoint containing {query} (and optionally {year})
        #[arg(long)]
        search_url: Option<String>,
        /// Link endpoint containing {page}
        #[arg(long)]
        links_url: Option<String>,
    },
    /// Add a new source, or replace an existing one
    Add {
        /// Source id
        id: String,
        /// Search endpoint containing {query} (and optionally {year})
        #[arg(long)]
        search_url: String,
        /// Link endpoint containing {page}
        #[arg(long)]
        links_url: Option<String>,
        /// Ranking priority (default 1.0)
        #[arg(long)]
        priority: Option<f32>,
        /// Short description
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print the config file location
    Path,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Pretty,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}
