use crate::cli::OutputFormat;
use crate::commands::Result;
use marquee_core::{CheckedLink, EngineConfig, SearchResponse};
use serde::{Deserialize, Serialize};

mod pretty;
pub use pretty::{
    format_links_table, format_results_table, format_sources_table,
    summarize_links, terminal_width,
};

/// One row of `marquee sources list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRow {
    pub id: String,
    pub enabled: bool,
    pub priority: f32,
    pub description: String,
    pub searchable: bool,
    pub has_links: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OutputData {
    SearchResults(SearchResponse),
    LinkReport {
        #[serde(skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        page_ref: Option<String>,
        links: Vec<CheckedLink>,
    },
    SourceList(Vec<SourceRow>),
    ConfigInfo(EngineConfig),
    ConfigPath(String),
}

/// Print machine-readable output. Pretty output is rendered by each command.
pub fn format_output(data: &OutputData, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(data)?);
        }
        OutputFormat::Pretty => {
            println!("{}", serde_yaml::to_string(data)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_data_is_tagged() {
        let data = OutputData::ConfigPath("/tmp/marquee.yaml".to_string());
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(
            value,
            json!({"type": "ConfigPath", "data": "/tmp/marquee.yaml"})
        );
    }
}
