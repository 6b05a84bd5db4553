//! Pretty formatter for terminal output.
//!
//! Results and links render as rounded UTF-8 tables sized to the terminal.
//! Status words are coloured so a glance down the first column is enough.

use super::SourceRow;
use comfy_table::{
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, ContentArrangement, Table,
};
use marquee_core::{CheckedLink, HealthStatus, HealthVerdict, SearchResponse};
use owo_colors::OwoColorize;

/// Terminal width for formatting (default fallback)
const DEFAULT_WIDTH: usize = 80;

/// Widest a title column gets before truncation
const MAX_TITLE_WIDTH: usize = 48;

const MAX_URL_WIDTH: usize = 60;

pub fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(DEFAULT_WIDTH)
}

fn new_table(width: usize) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(width.min(u16::MAX as usize) as u16);
    table
}

fn header(labels: &[&str]) -> Vec<Cell> {
    labels.iter().map(|l| Cell::new(*l)).collect()
}

/// Ranked search results, one row per merged result.
pub fn format_results_table(response: &SearchResponse, width: usize) -> String {
    let mut table = new_table(width);
    table.set_header(header(&[
        "#", "Title", "Year", "Quality", "Language", "Sources", "Match", "Score",
    ]));

    for (i, result) in response.results.iter().enumerate() {
        let year = result
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(truncate_str(&result.title, MAX_TITLE_WIDTH)),
            Cell::new(year),
            Cell::new(result.quality.as_str()),
            Cell::new(result.language.as_str()),
            Cell::new(result.source_ids().join(", ")),
            Cell::new(format!("{:.2}", result.match_score)),
            Cell::new(format!("{:.3}", result.rank_score)),
        ]);
    }

    table.to_string()
}

/// Checked links in verdict order.
pub fn format_links_table(links: &[CheckedLink], width: usize) -> String {
    let mut table = new_table(width);
    table.set_header(header(&[
        "Status", "Host", "Quality", "Size", "Code", "Time", "Reason", "URL",
    ]));

    for checked in links {
        let link = &checked.link;
        let verdict = &checked.verdict;
        table.add_row(vec![
            Cell::new(format_status(verdict)),
            Cell::new(or_dash(Some(link.host.as_str()))),
            Cell::new(or_dash(link.quality.as_deref())),
            Cell::new(or_dash(link.size.as_deref())),
            Cell::new(
                verdict
                    .response_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(
                verdict
                    .response_time_ms
                    .map(|ms| format!("{}ms", ms))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(or_dash(verdict.reason.as_deref())),
            Cell::new(truncate_str(&link.url, MAX_URL_WIDTH)),
        ]);
    }

    table.to_string()
}

pub fn format_sources_table(rows: &[SourceRow], width: usize) -> String {
    let mut table = new_table(width);
    table.set_header(header(&[
        "Source", "Enabled", "Priority", "Search", "Links", "Description",
    ]));

    let desc_width = width.saturating_sub(60).max(20);
    for row in rows {
        let enabled = if row.enabled {
            "yes".green().to_string()
        } else {
            "no".red().to_string()
        };
        table.add_row(vec![
            Cell::new(&row.id),
            Cell::new(enabled),
            Cell::new(format!("{:.2}", row.priority)),
            Cell::new(check_mark(row.searchable)),
            Cell::new(check_mark(row.has_links)),
            Cell::new(truncate_str(&row.description, desc_width)),
        ]);
    }

    table.to_string()
}

/// Coloured status word; trusted healthy links get a star.
pub fn format_status(verdict: &HealthVerdict) -> String {
    let label = verdict.status.as_str();
    let coloured = match verdict.status {
        HealthStatus::Healthy => label.green().bold().to_string(),
        HealthStatus::Locked => label.blue().to_string(),
        HealthStatus::Warning => label.yellow().to_string(),
        HealthStatus::Dead => label.red().to_string(),
    };
    if verdict.priority {
        format!("★ {}", coloured)
    } else {
        coloured
    }
}

/// One-line tally, e.g. "3 healthy, 1 dead (2 priority)".
pub fn summarize_links(links: &[CheckedLink]) -> String {
    let statuses = [
        HealthStatus::Healthy,
        HealthStatus::Locked,
        HealthStatus::Warning,
        HealthStatus::Dead,
    ];
    let parts: Vec<String> = statuses
        .iter()
        .filter_map(|status| {
            let n = links.iter().filter(|c| c.verdict.status == *status).count();
            (n > 0).then(|| format!("{} {}", n, status.as_str()))
        })
        .collect();

    let mut summary = if parts.is_empty() {
        "no links".to_string()
    } else {
        parts.join(", ")
    };
    let priority = links.iter().filter(|c| c.verdict.priority).count();
    if priority > 0 {
        summary.push_str(&format!(" ({} priority)", priority));
    }
    summary
}

fn check_mark(present: bool) -> String {
    if present {
        "✓".green().to_string()
    } else {
        "-".dimmed().to_string()
    }
}

fn or_dash(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    } else {
        s.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn checked(url: &str, host: &str, status: &str, priority: bool) -> CheckedLink {
        serde_json::from_value(json!({
            "link": {"url": url, "host": host, "quality": "1080p"},
            "verdict": {
                "status": status,
                "response_code": 200,
                "reason": "active",
                "priority": priority,
                "checked_at": "2026-01-01T00:00:00Z"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_truncate_str() {
        let long = "Kalki 2898 AD (2024) Hindi Dubbed 1080p WEB-DL x264";
        let truncated = truncate_str(long, 20);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 20);
        assert_eq!(truncate_str("Leo", 20), "Leo");
        assert_eq!(truncate_str("सालार भाग एक", 5).chars().count(), 5);
    }

    #[test]
    fn test_results_table_lists_sources() {
        let response: SearchResponse = serde_json::from_value(json!({
            "query": {"title": "Pushpa 2"},
            "results": [{
                "title": "Pushpa 2: The Rule",
                "year": 2024,
                "quality": "1080p",
                "language": "telugu",
                "match_score": 0.91,
                "sources": [
                    {"source": "moviezwap", "page_ref": "/m/1"},
                    {"source": "skysetx", "page_ref": "/s/9"}
                ],
                "rank_score": 1.2,
                "discovery_index": 0
            }],
            "completed": ["moviezwap", "skysetx"]
        }))
        .unwrap();

        let table = format_results_table(&response, 120);
        assert!(table.contains("Pushpa 2: The Rule"));
        assert!(table.contains("moviezwap, skysetx"));
        assert!(table.contains("2024"));
    }

    #[test]
    fn test_links_table_and_summary() {
        let links = vec![
            checked("https://gofile.io/d/abc", "gofile.io", "healthy", true),
            checked("https://mirror.example/f", "Mirror", "dead", false),
            checked("https://other.example/g", "Other", "dead", false),
        ];
        let table = format_links_table(&links, 160);
        assert!(table.contains("gofile.io"));
        assert!(table.contains("★"));

        assert_eq!(summarize_links(&links), "1 healthy, 2 dead (1 priority)");
        assert_eq!(summarize_links(&[]), "no links");
    }
}
