use crate::cli::{Cli, OutputFormat, SourcesAction};
use crate::commands::{config_store, CommandError, Result};
use crate::output::{format_output, format_sources_table, terminal_width, OutputData, SourceRow};
use marquee_core::{EngineConfig, HttpJsonSource, SourceSettings};
use owo_colors::OwoColorize;

pub fn run(cli: &Cli, action: SourcesAction) -> Result<()> {
    let store = config_store(cli);
    match action {
        SourcesAction::List => {
            let config = store.load()?;
            list(cli, &config)
        }
        SourcesAction::Enable { id } => {
            store.set_source_enabled(&id, true)?;
            done(&format!("Enabled source '{}'", id));
            Ok(())
        }
        SourcesAction::Disable { id } => {
            store.set_source_enabled(&id, false)?;
            done(&format!("Disabled source '{}'", id));
            Ok(())
        }
        SourcesAction::EnableAll => {
            let config = store.enable_all()?;
            done(&format!("Enabled {} source(s)", config.sources.len()));
            Ok(())
        }
        SourcesAction::DisableAll => {
            let config = store.disable_all()?;
            done(&format!("Disabled {} source(s)", config.sources.len()));
            Ok(())
        }
        SourcesAction::SetUrl {
            id,
            search_url,
            links_url,
        } => {
            if search_url.is_none() && links_url.is_none() {
                return Err(CommandError::InvalidInput(
                    "pass --search-url and/or --links-url".to_string(),
                ));
            }
            validate_urls(&id, search_url.as_deref(), links_url.as_deref())?;
            store.set_source_urls(&id, search_url, links_url)?;
            done(&format!("Updated endpoints for '{}'", id));
            Ok(())
        }
        SourcesAction::Add {
            id,
            search_url,
            links_url,
            priority,
            description,
        } => {
            validate_urls(&id, Some(&search_url), links_url.as_deref())?;
            let mut settings = SourceSettings::default().with_search_url(search_url);
            if let Some(url) = links_url {
                settings = settings.with_links_url(url);
            }
            if let Some(priority) = priority {
                settings = settings.with_priority(priority);
            }
            if let Some(description) = description {
                settings.description = description;
            }
            store.upsert_source(&id, settings)?;
            done(&format!("Added source '{}'", id));
            Ok(())
        }
    }
}

fn list(cli: &Cli, config: &EngineConfig) -> Result<()> {
    let rows = source_rows(config);
    match cli.output {
        OutputFormat::Pretty => {
            println!("{}", "Sources".bold().cyan());
            println!();
            println!("{}", format_sources_table(&rows, terminal_width()));
            if rows.iter().all(|r| !r.searchable) {
                println!();
                println!(
                    "{} Use {} to point a source at its endpoint",
                    "Tip:".green().bold(),
                    "marquee sources set-url <id> --search-url <url>".cyan()
                );
            }
        }
        _ => format_output(&OutputData::SourceList(rows), &cli.output)?,
    }
    Ok(())
}

fn source_rows(config: &EngineConfig) -> Vec<SourceRow> {
    config
        .sources
        .iter()
        .map(|(id, settings)| SourceRow {
            id: id.clone(),
            enabled: settings.enabled,
            priority: settings.priority,
            description: settings.description.clone(),
            searchable: settings.search_url.is_some(),
            has_links: settings.links_url.is_some(),
        })
        .collect()
}

/// Reject templates that the adapter would refuse at search time.
fn validate_urls(id: &str, search_url: Option<&str>, links_url: Option<&str>) -> Result<()> {
    let template = search_url.unwrap_or("{query}");
    let source = HttpJsonSource::new(id, template)?;
    if let Some(links_url) = links_url {
        source.with_links_url(links_url)?;
    }
    Ok(())
}

fn done(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}
