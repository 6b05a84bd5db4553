//! Engine configuration.
//!
//! Everything has sensible defaults; the YAML file at
//! `~/.config/marquee/config.yaml` only needs the values that differ.

use crate::error::CoreError;
use crate::federated::{
    RankWeights, SearchOptions, SourcePriorities, DEFAULT_OVERALL_DEADLINE_MS,
    DEFAULT_PER_SOURCE_TIMEOUT_MS, DEFAULT_PRIORITY, DEFAULT_RESULT_BUDGET,
};
use crate::health::{
    HealthOptions, DEFAULT_CONCURRENCY_LIMIT, DEFAULT_PER_LINK_TIMEOUT_MS,
    DEFAULT_SLOW_THRESHOLD_MS, DEFAULT_TRUSTED_HOSTS,
};
use crate::sources::HttpJsonSource;
use crate::SourceRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Sources known out of the box. They have no endpoints until configured.
const BUILTIN_SOURCES: &[(&str, &str)] = &[
    ("skysetx", "SkySetX movie listings"),
    ("moviezwap", "MoviezWap regional releases"),
    ("movierulz", "Movierulz listings"),
    ("downloadhub", "DownloadHub listings"),
    ("movies4u", "Movies4u listings"),
    ("moviebox", "MovieBox catalogue"),
    ("telegram", "Indexed Telegram channel posts"),
];

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchDefaults {
    pub per_source_timeout_ms: u64,
    pub overall_deadline_ms: u64,
    pub result_budget: usize,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            per_source_timeout_ms: DEFAULT_PER_SOURCE_TIMEOUT_MS,
            overall_deadline_ms: DEFAULT_OVERALL_DEADLINE_MS,
            result_budget: DEFAULT_RESULT_BUDGET,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthDefaults {
    pub concurrency_limit: usize,
    pub per_link_timeout_ms: u64,
    pub slow_threshold_ms: u64,
    pub trusted_hosts: Vec<String>,
}

impl Default for HealthDefaults {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            per_link_timeout_ms: DEFAULT_PER_LINK_TIMEOUT_MS,
            slow_threshold_ms: DEFAULT_SLOW_THRESHOLD_MS,
            trusted_hosts: DEFAULT_TRUSTED_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

/// Per-source settings, editable at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_priority")]
    pub priority: f32,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Search endpoint template containing `{query}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_url: Option<String>,

    /// Link endpoint template containing `{page}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links_url: Option<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_priority() -> f32 {
    DEFAULT_PRIORITY
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: DEFAULT_PRIORITY,
            description: String::new(),
            search_url: None,
            links_url: None,
        }
    }
}

impl SourceSettings {
    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = Some(url.into());
        self
    }

    pub fn with_links_url(mut self, url: impl Into<String>) -> Self {
        self.links_url = Some(url.into());
        self
    }

    pub fn with_priority(mut self, priority: f32) -> Self {
        self.priority = priority;
        self
    }
}

// ============================================================================
// EngineConfig
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub search: SearchDefaults,
    pub health: HealthDefaults,
    pub weights: RankWeights,
    pub sources: BTreeMap<String, SourceSettings>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let sources = BUILTIN_SOURCES
            .iter()
            .map(|(id, description)| {
                (
                    id.to_string(),
                    SourceSettings {
                        description: description.to_string(),
                        ..SourceSettings::default()
                    },
                )
            })
            .collect();
        Self {
            search: SearchDefaults::default(),
            health: HealthDefaults::default(),
            weights: RankWeights::default(),
            sources,
        }
    }
}

impl EngineConfig {
    /// Ids of enabled sources, sorted.
    pub fn enabled_sources(&self) -> Vec<String> {
        self.sources
            .iter()
            .filter(|(_, s)| s.enabled)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn priorities(&self) -> SourcePriorities {
        let mut priorities = SourcePriorities::new();
        for (id, settings) in &self.sources {
            priorities.set(id.clone(), settings.priority);
        }
        priorities
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            per_source_timeout: Duration::from_millis(self.search.per_source_timeout_ms),
            overall_deadline: Duration::from_millis(self.search.overall_deadline_ms),
            result_budget: self.search.result_budget,
            enabled_sources: Some(self.enabled_sources()),
            weights: self.weights.clone(),
            priorities: self.priorities(),
        }
    }

    pub fn health_options(&self) -> HealthOptions {
        HealthOptions {
            concurrency_limit: self.health.concurrency_limit,
            per_link_timeout: Duration::from_millis(self.health.per_link_timeout_ms),
            slow_threshold: Duration::from_millis(self.health.slow_threshold_ms),
            trusted_hosts: self.health.trusted_hosts.clone(),
        }
    }

    /// Register an `HttpJsonSource` for every source with a search endpoint.
    ///
    /// Disabled sources are registered too; `search_options` filters them.
    pub fn build_registry(&self) -> Result<SourceRegistry, CoreError> {
        let mut registry = SourceRegistry::new();
        for (id, settings) in &self.sources {
            let Some(search_url) = settings.search_url.as_deref() else {
                debug!(target: "marquee.config", source = %id, "no search_url, skipping");
                continue;
            };
            let source = HttpJsonSource::new(id.clone(), search_url)?
                .with_description(settings.description.clone());
            match settings.links_url.as_deref() {
                Some(links_url) => {
                    let source = Arc::new(source.with_links_url(links_url)?);
                    registry.register_with_extractor(source.clone(), source);
                }
                None => registry.register(Arc::new(source)),
            }
        }
        Ok(registry)
    }

    fn source_mut(&mut self, id: &str) -> Result<&mut SourceSettings, CoreError> {
        self.sources
            .get_mut(id)
            .ok_or_else(|| CoreError::UnknownSource(id.to_string()))
    }
}

// ============================================================================
// ConfigStore
// ============================================================================

/// YAML-backed storage for [`EngineConfig`].
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store at `~/.config/marquee/config.yaml` (platform config dir).
    pub fn new_default() -> Self {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join("marquee").join("config.yaml"),
        }
    }

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config. A missing file yields defaults; a malformed file is
    /// an error rather than a silent reset.
    pub fn load(&self) -> Result<EngineConfig, CoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(EngineConfig::default()),
            Ok(content) => serde_yaml::from_str(&content).map_err(|e| {
                CoreError::Config(format!("{}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    target: "marquee.config",
                    path = %self.path.display(),
                    "no config file, using defaults"
                );
                Ok(EngineConfig::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, config: &EngineConfig) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(config)
            .map_err(|e| CoreError::Config(format!("serialize: {}", e)))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    fn update<F>(&self, mutate: F) -> Result<EngineConfig, CoreError>
    where
        F: FnOnce(&mut EngineConfig) -> Result<(), CoreError>,
    {
        let mut config = self.load()?;
        mutate(&mut config)?;
        self.save(&config)?;
        Ok(config)
    }

    pub fn set_source_enabled(&self, id: &str, enabled: bool) -> Result<EngineConfig, CoreError> {
        self.update(|config| {
            config.source_mut(id)?.enabled = enabled;
            Ok(())
        })
    }

    pub fn enable_all(&self) -> Result<EngineConfig, CoreError> {
        self.update(|config| {
            config.sources.values_mut().for_each(|s| s.enabled = true);
            Ok(())
        })
    }

    pub fn disable_all(&self) -> Result<EngineConfig, CoreError> {
        self.update(|config| {
            config.sources.values_mut().for_each(|s| s.enabled = false);
            Ok(())
        })
    }

    /// Replace a source's endpoints. `None` leaves a field unchanged.
    pub fn set_source_urls(
        &self,
        id: &str,
        search_url: Option<String>,
        links_url: Option<String>,
    ) -> Result<EngineConfig, CoreError> {
        self.update(|config| {
            let settings = config.source_mut(id)?;
            if let Some(url) = search_url {
                settings.search_url = Some(url);
            }
            if let Some(url) = links_url {
                settings.links_url = Some(url);
            }
            Ok(())
        })
    }

    /// Add or replace a source.
    pub fn upsert_source(
        &self,
        id: &str,
        settings: SourceSettings,
    ) -> Result<EngineConfig, CoreError> {
        if id.trim().is_empty() {
            return Err(CoreError::InvalidOptions("source id must not be empty".to_string()));
        }
        self.update(|config| {
            if config.sources.insert(id.to_string(), settings).is_some() {
                warn!(target: "marquee.config", source = id, "replacing existing source settings");
            }
            Ok(())
        })
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested").join("config.yaml"));
        (dir, store)
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.search.result_budget, 20);
        assert_eq!(config.health.trusted_hosts, vec!["gofile.io"]);
        assert!(config.sources.contains_key("skysetx"));
        assert!(config.sources.values().all(|s| s.enabled && s.search_url.is_none()));

        let options = config.search_options();
        assert_eq!(options.per_source_timeout, Duration::from_secs(10));
        assert_eq!(options.overall_deadline, Duration::from_secs(25));
        assert_eq!(config.health_options(), HealthOptions::default());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
search:
  result_budget: 5
sources:
  moviezwap:
    search_url: "http://localhost:9000/search?q={query}"
    priority: 1.5
"#;
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.search.result_budget, 5);
        assert_eq!(config.search.per_source_timeout_ms, DEFAULT_PER_SOURCE_TIMEOUT_MS);
        assert_eq!(config.sources.len(), 1);
        let mz = &config.sources["moviezwap"];
        assert!(mz.enabled);
        assert_eq!(config.priorities().priority_for("moviezwap"), 1.5);
    }

    #[test]
    fn test_load_missing_and_malformed() {
        let (_dir, store) = store();
        assert_eq!(store.load().unwrap(), EngineConfig::default());

        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "search: [not, a, map]").unwrap();
        assert!(matches!(store.load(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_toggle_sources() {
        let (_dir, store) = store();

        let config = store.disable_all().unwrap();
        assert!(config.enabled_sources().is_empty());

        store.set_source_enabled("telegram", true).unwrap();
        assert_eq!(store.load().unwrap().enabled_sources(), vec!["telegram"]);

        let config = store.enable_all().unwrap();
        assert_eq!(config.enabled_sources().len(), config.sources.len());

        assert!(matches!(
            store.set_source_enabled("nope", false),
            Err(CoreError::UnknownSource(_))
        ));
    }

    #[test]
    fn test_urls_and_registry() {
        let (_dir, store) = store();
        store
            .set_source_urls(
                "skysetx",
                Some("http://localhost:8001/search?q={query}".to_string()),
                Some("http://localhost:8001/links?page={page}".to_string()),
            )
            .unwrap();
        store
            .upsert_source(
                "local",
                SourceSettings::default().with_search_url("http://localhost:8002/{query}"),
            )
            .unwrap();

        let config = store.load().unwrap();
        let registry = config.build_registry().unwrap();
        assert_eq!(registry.ids(), &["local", "skysetx"]);
        assert!(registry.extractor("skysetx").is_some());
        assert!(registry.extractor("local").is_none());

        assert!(matches!(
            store.set_source_urls("nope", None, None),
            Err(CoreError::UnknownSource(_))
        ));
    }

    #[test]
    fn test_bad_template_rejected_by_registry() {
        let mut config = EngineConfig::default();
        config.sources.insert(
            "broken".to_string(),
            SourceSettings::default().with_search_url("http://localhost/search"),
        );
        assert!(matches!(config.build_registry(), Err(CoreError::Config(_))));
    }
}
