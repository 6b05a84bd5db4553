//! Configuration-driven source backed by a JSON search endpoint.
//!
//! Each scraping backend is expected to sit behind a small HTTP service that
//! answers `search_url` with a JSON list of listings and, optionally,
//! `links_url` with the download links of one listing page.

use crate::error::{CoreError, SourceError};
use crate::federated::{Query, RawCandidate};
use crate::health::{url_host, RawLink};
use crate::{LinkExtractor, SourceAdapter};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

const TITLE_FIELDS: &[&str] = &["title", "name"];
const PAGE_FIELDS: &[&str] = &["url", "link", "page", "detail_url"];
const LINK_URL_FIELDS: &[&str] = &["url", "link"];

/// A source whose search and link endpoints are URL templates.
#[derive(Clone)]
pub struct HttpJsonSource {
    id: String,
    description: String,
    search_url: String,
    links_url: Option<String>,
    client: Client,
}

impl HttpJsonSource {
    /// `search_url` must contain `{query}`; `{year}` is optional.
    pub fn new(id: impl Into<String>, search_url: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        let search_url = search_url.into();
        if !search_url.contains("{query}") {
            return Err(CoreError::Config(format!(
                "search_url for '{}' must contain {{query}}",
                id
            )));
        }
        let client = Client::builder()
            .user_agent(concat!("marquee/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            id,
            description: String::new(),
            search_url,
            links_url: None,
            client,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// `links_url` must contain `{page}`.
    pub fn with_links_url(mut self, links_url: impl Into<String>) -> Result<Self, CoreError> {
        let links_url = links_url.into();
        if !links_url.contains("{page}") {
            return Err(CoreError::Config(format!(
                "links_url for '{}' must contain {{page}}",
                self.id
            )));
        }
        self.links_url = Some(links_url);
        Ok(self)
    }

    pub fn has_links(&self) -> bool {
        self.links_url.is_some()
    }

    fn search_endpoint(&self, query: &Query) -> String {
        let year = query.year.map(|y| y.to_string()).unwrap_or_default();
        self.search_url
            .replace("{query}", &urlencoding::encode(query.title.trim()))
            .replace("{year}", &year)
    }

    async fn get_json(&self, endpoint: &str) -> Result<Value, String> {
        let response = self
            .client
            .get(endpoint)
            .send()
            .await
            .map_err(|e| format!("Request error: {}", e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| format!("JSON parse error: {}", e))
    }
}

#[async_trait]
impl SourceAdapter for HttpJsonSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn search(&self, query: &Query) -> Result<Vec<RawCandidate>, SourceError> {
        let endpoint = self.search_endpoint(query);
        debug!(target: "marquee.sources", source = %self.id, endpoint = %endpoint, "searching");

        let raw = self
            .get_json(&endpoint)
            .await
            .map_err(|e| SourceError::failure(&self.id, e))?;

        Ok(find_array(&raw, &["movies", "results", "items", "data"])
            .into_iter()
            .filter_map(|item| candidate_from(&self.id, item))
            .collect())
    }
}

#[async_trait]
impl LinkExtractor for HttpJsonSource {
    async fn extract(&self, page_ref: &str) -> Result<Vec<RawLink>, SourceError> {
        let template = self.links_url.as_deref().ok_or_else(|| {
            SourceError::extraction(&self.id, "no links endpoint configured")
        })?;
        let endpoint = template.replace("{page}", &urlencoding::encode(page_ref));

        let raw = self
            .get_json(&endpoint)
            .await
            .map_err(|e| SourceError::extraction(&self.id, e))?;

        Ok(find_array(&raw, &["links", "downloads", "results"])
            .into_iter()
            .filter_map(link_from)
            .collect())
    }
}

/// Find the listing array in common response shapes.
fn find_array<'a>(raw: &'a Value, fields: &[&str]) -> Vec<&'a Value> {
    for field in fields {
        if let Some(arr) = raw.get(*field).and_then(|v| v.as_array()) {
            return arr.iter().collect();
        }
    }
    raw.as_array().map(|arr| arr.iter().collect()).unwrap_or_default()
}

fn first_string(item: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match item.get(*field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn candidate_from(source: &str, item: &Value) -> Option<RawCandidate> {
    let obj = item.as_object()?;
    let title = first_string(item, TITLE_FIELDS)?;
    let page_ref = first_string(item, PAGE_FIELDS)?;

    let mut candidate = RawCandidate::new(source, title, page_ref);
    candidate.year = first_string(item, &["year"]);
    candidate.quality = first_string(item, &["quality"]);
    candidate.language = first_string(item, &["language"]);

    let known: Vec<&str> = TITLE_FIELDS
        .iter()
        .chain(PAGE_FIELDS)
        .chain(&["year", "quality", "language"])
        .copied()
        .collect();
    candidate.extra = obj
        .iter()
        .filter(|(k, _)| !known.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect::<Map<String, Value>>();

    Some(candidate)
}

fn link_from(item: &Value) -> Option<RawLink> {
    let url = first_string(item, LINK_URL_FIELDS)?;
    let host = first_string(item, &["host"])
        .or_else(|| url_host(&url))
        .unwrap_or_default();

    Some(RawLink {
        url,
        host,
        quality: first_string(item, &["quality"]),
        size: first_string(item, &["size"]),
        language: first_string(item, &["language"]),
    })
}
