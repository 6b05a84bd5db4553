use crate::cli::{Cli, HealthArgs, OutputFormat};
use crate::commands::{health_options, load_config, spinner, CommandError, Result};
use crate::output::{
    format_links_table, format_output, summarize_links, terminal_width, OutputData,
};
use marquee_core::{check_link_health, CheckedLink, RawLink};
use owo_colors::OwoColorize;
use serde::Deserialize;
use std::io::Read;

/// A link as written in an input file: a bare URL or a full object.
#[derive(Deserialize)]
#[serde(untagged)]
enum LinkInput {
    Url(String),
    Link(RawLink),
}

impl From<LinkInput> for RawLink {
    fn from(input: LinkInput) -> Self {
        match input {
            LinkInput::Url(url) => RawLink::new(url),
            LinkInput::Link(link) if link.host.trim().is_empty() => {
                let RawLink {
                    url,
                    quality,
                    size,
                    language,
                    ..
                } = link;
                RawLink {
                    quality,
                    size,
                    language,
                    ..RawLink::new(url)
                }
            }
            LinkInput::Link(link) => link,
        }
    }
}

/// Health-check links listed in a JSON file (or stdin when `input` is `-`).
pub async fn run(cli: &Cli, input: &str, health: &HealthArgs) -> Result<()> {
    let config = load_config(cli)?;
    let options = health_options(&config, health);

    let content = if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input)?
    };
    let links = parse_links(&content)?;

    let spinner = spinner(cli, format!("Checking {} link(s)...", links.len()));
    let checked = check_link_health(links, &options).await;
    spinner.finish_and_clear();
    let checked = checked?;

    match cli.output {
        OutputFormat::Pretty => print_report(&checked),
        _ => {
            let data = OutputData::LinkReport {
                source: None,
                page_ref: None,
                links: checked,
            };
            format_output(&data, &cli.output)?;
        }
    }
    Ok(())
}

fn parse_links(content: &str) -> Result<Vec<RawLink>> {
    let inputs: Vec<LinkInput> = serde_json::from_str(content)?;
    let links: Vec<RawLink> = inputs.into_iter().map(RawLink::from).collect();
    if let Some(bad) = links.iter().find(|l| l.url.trim().is_empty()) {
        return Err(CommandError::InvalidInput(format!(
            "link with empty url (host '{}')",
            bad.host
        )));
    }
    Ok(links)
}

pub(crate) fn print_report(checked: &[CheckedLink]) {
    println!();
    if checked.is_empty() {
        println!("{}", "No links to check.".yellow());
        return;
    }
    println!("{}", format_links_table(checked, terminal_width()));
    println!();
    println!("{} {}", "Summary:".bold(), summarize_links(checked));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_urls_and_objects() {
        let links = parse_links(
            r#"[
                "https://gofile.io/d/abc",
                {"url": "https://pixeldrain.com/u/x", "host": "PixelDrain", "size": "1.4GB"},
                {"url": "https://store3.gofile.io/d/y", "quality": "720p"}
            ]"#,
        )
        .unwrap();

        assert_eq!(links.len(), 3);
        assert_eq!(links[0].host, "gofile.io");
        assert_eq!(links[1].host, "PixelDrain");
        assert_eq!(links[1].size.as_deref(), Some("1.4GB"));
        assert_eq!(links[2].host, "store3.gofile.io");
        assert_eq!(links[2].quality.as_deref(), Some("720p"));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            parse_links("{\"url\": \"x\"}"),
            Err(CommandError::Serialization(_))
        ));
        assert!(matches!(
            parse_links("[{\"url\": \"  \", \"host\": \"x\"}]"),
            Err(CommandError::InvalidInput(_))
        ));
    }
}
