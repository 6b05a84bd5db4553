use crate::cli::{Cli, OutputFormat, SearchArgs};
use crate::commands::{load_config, spinner, split_list, CommandError, Result};
use crate::output::{format_output, format_results_table, terminal_width, OutputData};
use marquee_core::{
    CoreError, EngineConfig, Language, Quality, Query, SearchEngine, SearchResponse,
    SourceRegistry,
};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Run a federated search across the enabled (or selected) sources.
pub async fn run(cli: &Cli, args: &SearchArgs) -> Result<()> {
    let config = load_config(cli)?;
    let registry = config.build_registry()?;
    if registry.is_empty() {
        return Err(CommandError::NoSearchableSources);
    }

    let query = build_query(args)?;

    let mut options = config.search_options();
    if let Some(list) = &args.sources {
        options = options.with_sources(select_sources(&config, &registry, list)?);
    }
    if let Some(budget) = args.budget {
        options = options.with_budget(budget);
    }
    if args.timeout_ms.is_some() || args.deadline_ms.is_some() {
        let per_source = args
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(options.per_source_timeout);
        let overall = args
            .deadline_ms
            .map(Duration::from_millis)
            .unwrap_or(options.overall_deadline);
        options = options.with_timeouts(per_source, overall);
    }

    let spinner = spinner(cli, format!("Searching for '{}'...", query.title));
    let response = SearchEngine::new(&registry).search(&query, &options).await;
    spinner.finish_and_clear();
    let response = response?;
    let failed = response.all_failed().then_some(response.errors.len());

    match cli.output {
        OutputFormat::Pretty => print_pretty(&response),
        _ => format_output(&OutputData::SearchResults(response), &cli.output)?,
    }

    match failed {
        Some(n) => Err(CommandError::AllSourcesFailed(n)),
        None => Ok(()),
    }
}

/// Resolve `-s` against the registry; every id must be searchable.
fn select_sources(
    config: &EngineConfig,
    registry: &SourceRegistry,
    list: &str,
) -> Result<Vec<String>> {
    let selected = split_list(list);
    for id in &selected {
        if !config.sources.contains_key(id) {
            return Err(CoreError::UnknownSource(id.clone()).into());
        }
        if registry.get(id).is_none() {
            return Err(CommandError::SourceNotSearchable(id.clone()));
        }
    }
    Ok(selected)
}

fn build_query(args: &SearchArgs) -> Result<Query> {
    let mut query = Query::new(args.title.trim());
    if let Some(year) = args.year {
        query = query.with_year(year);
    }
    if let Some(text) = &args.language {
        let language = Language::from_token(text);
        if !language.is_known() {
            return Err(CommandError::InvalidInput(format!(
                "unknown language '{}'",
                text
            )));
        }
        query = query.with_language(language);
    }
    if let Some(text) = &args.quality {
        let quality = Quality::from_token(text);
        if !quality.is_known() {
            return Err(CommandError::InvalidInput(format!(
                "unknown quality '{}' (expected 4k, 1080p, 720p or 480p)",
                text
            )));
        }
        query = query.with_quality(quality);
    }
    Ok(query)
}

fn print_pretty(response: &SearchResponse) {
    println!();
    if response.all_failed() {
        println!(
            "{} every source failed for '{}'",
            "✗".red().bold(),
            response.query.title.bold()
        );
    } else if response.results.is_empty() {
        println!(
            "{} No matches for '{}' across {} source(s)",
            "∅".yellow(),
            response.query.title.bold(),
            response.completed.len()
        );
    } else {
        println!(
            "{} {} result(s) for '{}'",
            "Search".bold().cyan(),
            response.results.len().to_string().green().bold(),
            response.query.title.bold()
        );
        println!();
        println!("{}", format_results_table(response, terminal_width()));
    }

    if !response.errors.is_empty() {
        println!();
        println!("{}", "Source errors:".yellow().bold());
        for err in &response.errors {
            println!(
                "  {} {} {}",
                err.source_id.yellow(),
                format!("[{}]", err.kind.as_str()).dimmed(),
                err.detail
            );
        }
    }

    if let Some(ms) = response.duration_ms {
        println!();
        println!(
            "{}",
            format!(
                "{} of {} source(s) answered in {}ms",
                response.completed.len(),
                response.completed.len() + response.errors.len(),
                ms
            )
            .dimmed()
        );
    }
}
