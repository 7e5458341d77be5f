//! TOML configuration.
//!
//! ```toml
//! [knowledge]
//! path = "./data/studio.toml"     # optional; built-in knowledge otherwise
//!
//! [cache]
//! max_size = 500
//! cleanup_interval_secs = 60
//!
//! [rate_limit]
//! window_secs = 3600
//!
//! [engine]
//! provider = "local"              # or "remote"
//!
//! [pipelines.tattoo_knowledge]
//! description = "Routed studio assistant"
//! rate_limit = 100
//! cache_ttl_secs = 300
//! ```
//!
//! When no `[pipelines.*]` tables are present the four built-in pipelines
//! from [`default_pipelines`] apply.

use anyhow::{bail, Context, Result};
use ink_router_core::PipelineCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub pipelines: BTreeMap<String, PipelineConfig>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct KnowledgeConfig {
    /// Knowledge file overriding the built-in studio data.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

fn default_max_size() -> usize {
    500
}
fn default_cleanup_interval() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
        }
    }
}

fn default_window_secs() -> u64 {
    3600
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            url: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    2
}

/// Per-pipeline options. Returned by `pipeline_info` and `list_pipelines`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Fixed category; `None` routes every query through the IntentRouter.
    #[serde(default)]
    pub category: Option<PipelineCategory>,
    #[serde(default)]
    pub description: String,
    /// Requests allowed per client per rate-limit window.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,
    /// Advisory only; not enforced by the dispatcher.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    #[serde(default = "default_mobile_max_suggestions")]
    pub mobile_max_suggestions: usize,
}

fn default_rate_limit() -> u32 {
    100
}
fn default_timeout_ms() -> u64 {
    5000
}
fn default_cache_enabled() -> bool {
    true
}
fn default_cache_ttl() -> u64 {
    300
}
fn default_max_suggestions() -> usize {
    4
}
fn default_mobile_max_suggestions() -> usize {
    3
}

impl PipelineConfig {
    pub fn new(category: Option<PipelineCategory>, description: &str) -> Self {
        Self {
            category,
            description: description.to_string(),
            rate_limit: default_rate_limit(),
            timeout_ms: default_timeout_ms(),
            cache_enabled: default_cache_enabled(),
            cache_ttl_secs: default_cache_ttl(),
            max_suggestions: default_max_suggestions(),
            mobile_max_suggestions: default_mobile_max_suggestions(),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Suggestion cap for the given display context.
    pub fn suggestion_cap(&self, mobile: bool) -> usize {
        if mobile {
            self.mobile_max_suggestions
        } else {
            self.max_suggestions
        }
    }
}

/// The pipelines used when the config file defines none.
pub fn default_pipelines() -> BTreeMap<String, PipelineConfig> {
    let mut chat = PipelineConfig::new(
        Some(PipelineCategory::Conversation),
        "Small talk and general questions",
    );
    chat.cache_enabled = false;

    BTreeMap::from([
        (
            "tattoo_knowledge".to_string(),
            PipelineConfig::new(None, "Routed studio assistant"),
        ),
        (
            "studio_services".to_string(),
            PipelineConfig::new(
                Some(PipelineCategory::ServiceOps),
                "Bookings, hours, deposits and consultations",
            ),
        ),
        (
            "sales_assistant".to_string(),
            PipelineConfig::new(
                Some(PipelineCategory::Sales),
                "Quotes, packages, promotions and gift cards",
            ),
        ),
        ("studio_chat".to_string(), chat),
    ])
}

impl Config {
    /// All defaults, built-in knowledge and the built-in pipelines.
    pub fn minimal() -> Self {
        Self {
            knowledge: KnowledgeConfig::default(),
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            engine: EngineConfig::default(),
            pipelines: default_pipelines(),
        }
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit.window_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cache.cleanup_interval_secs)
    }

    /// Check every rule serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.cache.max_size == 0 {
            bail!("cache.max_size must be >= 1");
        }
        if self.cache.cleanup_interval_secs == 0 {
            bail!("cache.cleanup_interval_secs must be >= 1");
        }
        if self.rate_limit.window_secs == 0 {
            bail!("rate_limit.window_secs must be >= 1");
        }

        match self.engine.provider.as_str() {
            "local" => {}
            "remote" => {
                if self.engine.url.as_deref().map_or(true, |u| u.trim().is_empty()) {
                    bail!("engine.url must be set when provider is 'remote'");
                }
                if self.engine.timeout_secs == 0 {
                    bail!("engine.timeout_secs must be > 0");
                }
            }
            other => bail!(
                "Unknown engine provider: '{}'. Must be local or remote.",
                other
            ),
        }

        for (name, p) in &self.pipelines {
            validate_pipeline_name(name)?;
            if p.rate_limit == 0 {
                bail!("pipelines.{}.rate_limit must be >= 1", name);
            }
            if p.cache_ttl_secs == 0 {
                bail!("pipelines.{}.cache_ttl_secs must be >= 1", name);
            }
            if p.max_suggestions < 2 {
                bail!("pipelines.{}.max_suggestions must be >= 2", name);
            }
            if p.mobile_max_suggestions < 2 {
                bail!("pipelines.{}.mobile_max_suggestions must be >= 2", name);
            }
        }

        Ok(())
    }
}

fn validate_pipeline_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid {
        bail!(
            "Invalid pipeline name '{}': use lowercase letters, digits, or '_'",
            name
        );
    }
    Ok(())
}

/// Parse configuration from TOML text, filling in the built-in pipelines
/// when none are defined.
pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;
    if config.pipelines.is_empty() {
        config.pipelines = default_pipelines();
    }
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
///
/// A file that exists but fails to parse or validate is still an error.
pub fn load_config_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}
