use crate::cli::{Cli, HealthArgs, OutputFormat};
use crate::commands::{health_options, load_config, spinner, Result};
use crate::output::{format_output, OutputData};
use marquee_core::{check_link_health, extract_links};
use owo_colors::OwoColorize;

/// Extract the download links behind a result page, then health-check them.
pub async fn run(cli: &Cli, source: &str, page_ref: &str, health: &HealthArgs) -> Result<()> {
    let config = load_config(cli)?;
    let registry = config.build_registry()?;
    let options = health_options(&config, health);
    let extract_timeout = config.search_options().per_source_timeout;

    let spinner = spinner(cli, format!("Extracting links from {}...", source));
    let extracted = extract_links(&registry, source, page_ref, extract_timeout).await;
    let links = match extracted {
        Ok(Ok(links)) => links,
        Ok(Err(err)) => {
            spinner.finish_and_clear();
            return Err(err.into());
        }
        Err(err) => {
            spinner.finish_and_clear();
            return Err(err.into());
        }
    };

    spinner.set_message(format!("Checking {} link(s)...", links.len()));
    let checked = check_link_health(links, &options).await;
    spinner.finish_and_clear();
    let checked = checked?;

    match cli.output {
        OutputFormat::Pretty => {
            println!();
            println!(
                "{} {} {}",
                "Links".bold().cyan(),
                source.bold(),
                page_ref.dimmed()
            );
            super::check::print_report(&checked);
        }
        _ => {
            let data = OutputData::LinkReport {
                source: Some(source.to_string()),
                page_ref: Some(page_ref.to_string()),
                links: checked,
            };
            format_output(&data, &cli.output)?;
        }
    }
    Ok(())
}
