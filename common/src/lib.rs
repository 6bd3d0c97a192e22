/*!
common/src/lib.rs

Shared configuration types and post data model for Syndicator.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader merging a default and an override config file
- Startup validation and secret resolution
- The post types passed between pipeline stages and written to the run log
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Collection receiving syndicated posts on the production platform.
pub const DEFAULT_COLLECTION_ID: &str = "665f2bee7532c57800729dbf";

/// One source blog: where to find its listing page and how to read its articles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub id: String,
    /// Display name, removed from reworded content by the generation prompts
    pub name: String,
    /// Host (and optional port) used to absolutize relative links, e.g. "blog.example.com"
    pub domain: String,
    pub listing_url: String,
    pub link_selector: String,
    pub title_selector: String,
    pub body_selector: String,
}

/// Content platform (Webflow CMS) section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_platform_url")]
    pub api_url: String,
    #[serde(default = "default_collection_id")]
    pub collection_id: String,
    #[serde(default = "default_platform_key_env")]
    pub api_key_env: String,
    /// Plain author field set on every created item, if configured
    pub author_name: Option<String>,
    #[serde(default = "default_platform_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// Generation service section (OpenAI-compatible endpoints)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Chat completions endpoint
    #[serde(default = "default_llm_url")]
    pub api_url: String,
    /// Image generation endpoint; derived from `api_url` when absent
    pub images_url: Option<String>,
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_image_size")]
    pub image_size: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
    /// Completion token limit; the service default applies when absent
    pub max_tokens: Option<usize>,
    /// Sampling temperature; the service default applies when absent
    pub temperature: Option<f32>,
}

/// Randomized delay inserted before each article fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

/// Source-site fetching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Where run logs are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLogConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub run_log: RunLogConfig,
}

fn default_platform_url() -> String {
    "https://api.webflow.com/v2".to_string()
}
fn default_collection_id() -> String {
    DEFAULT_COLLECTION_ID.to_string()
}
fn default_platform_key_env() -> String {
    "WEBFLOW_API_KEY".to_string()
}
fn default_platform_timeout() -> u64 {
    30
}
fn default_page_size() -> usize {
    100
}
fn default_llm_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_llm_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_model() -> String {
    "gpt-4o".to_string()
}
fn default_image_model() -> String {
    "dall-e-3".to_string()
}
fn default_image_size() -> String {
    "1024x1024".to_string()
}
fn default_llm_timeout() -> u64 {
    120
}
fn default_min_delay() -> u64 {
    1000
}
fn default_max_delay() -> u64 {
    4000
}
fn default_fetch_timeout() -> u64 {
    15
}
fn default_user_agent() -> String {
    "Syndicator/0.1.0".to_string()
}
fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_url: default_platform_url(),
            collection_id: default_collection_id(),
            api_key_env: default_platform_key_env(),
            author_name: None,
            timeout_seconds: default_platform_timeout(),
            page_size: default_page_size(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: default_llm_url(),
            images_url: None,
            api_key_env: default_llm_key_env(),
            model: default_model(),
            image_model: default_image_model(),
            image_size: default_image_size(),
            timeout_seconds: default_llm_timeout(),
            max_tokens: None,
            temperature: None,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_fetch_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for RunLogConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    /// Check everything that must hold before the run touches the network.
    /// CSS selectors are checked by the caller, which owns the HTML parser.
    pub fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            anyhow::bail!("No blog site is defined");
        }

        let mut seen = HashSet::new();
        for site in &self.sites {
            if site.id.trim().is_empty() {
                anyhow::bail!("Site '{}' has an empty id", site.name);
            }
            if !seen.insert(site.id.as_str()) {
                anyhow::bail!("Duplicate site id: {}", site.id);
            }
            if site.domain.trim().is_empty() {
                anyhow::bail!("Site '{}' has an empty domain", site.id);
            }
            url::Url::parse(&site.listing_url)
                .with_context(|| format!("Site '{}' has an invalid listing_url: {}", site.id, site.listing_url))?;
        }

        if self.pacing.min_delay_ms > self.pacing.max_delay_ms {
            anyhow::bail!(
                "pacing.min_delay_ms ({}) is greater than pacing.max_delay_ms ({})",
                self.pacing.min_delay_ms,
                self.pacing.max_delay_ms
            );
        }
        if self.platform.page_size == 0 {
            anyhow::bail!("platform.page_size must be at least 1");
        }

        Ok(())
    }

    /// Restrict the configured sites to a single id.
    pub fn retain_site(&mut self, site_id: &str) -> Result<()> {
        self.sites.retain(|s| s.id == site_id);
        if self.sites.is_empty() {
            anyhow::bail!("Unknown site id: {}", site_id);
        }
        Ok(())
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Read a required secret from the environment variable named in the config.
/// A missing or blank variable is an error.
pub fn resolve_secret(env_name: &str) -> Result<String> {
    let value = std::env::var(env_name)
        .with_context(|| format!("{} is not set in the environment variables", env_name))?;
    if value.trim().is_empty() {
        anyhow::bail!("{} is set but empty", env_name);
    }
    Ok(value)
}

/// An article as harvested from its source site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginalPost {
    /// Absolute URL, the deduplication key stored on the platform
    pub original_link: String,
    pub title: String,
    /// Sanitized body markup
    pub html_content: String,
}

/// The reworded version of an `OriginalPost`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReformulatedPost {
    pub title: String,
    pub html_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// One processed post, as recorded in the run log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEntry {
    pub original: OriginalPost,
    pub reformulated: ReformulatedPost,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const MINIMAL: &str = r#"
        [[sites]]
        id = "acme"
        name = "Acme Blog"
        domain = "blog.acme.test"
        listing_url = "https://blog.acme.test/articles"
        link_selector = "a.post-card"
        title_selector = "h1"
        body_selector = ".post-body"
    "#;

    #[test]
    fn config_from_string_applies_defaults() {
        let cfg: Config = toml::from_str(MINIMAL).expect("parse config");
        assert_eq!(cfg.sites.len(), 1);
        assert_eq!(cfg.sites[0].id, "acme");
        assert_eq!(cfg.platform.collection_id, DEFAULT_COLLECTION_ID);
        assert_eq!(cfg.platform.api_key_env, "WEBFLOW_API_KEY");
        assert_eq!(cfg.llm.model, "gpt-4o");
        assert_eq!(cfg.llm.image_size, "1024x1024");
        assert_eq!(cfg.llm.max_tokens, None);
        assert_eq!(cfg.llm.temperature, None);
        assert_eq!(cfg.pacing.min_delay_ms, 1000);
        assert_eq!(cfg.pacing.max_delay_ms, 4000);
        assert_eq!(cfg.run_log.dir, "logs");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn llm_generation_limits_are_read_from_config() {
        let text = format!("{MINIMAL}\n[llm]\nmax_tokens = 2000\ntemperature = 0.5\n");
        let cfg: Config = toml::from_str(&text).expect("parse config");
        assert_eq!(cfg.llm.max_tokens, Some(2000));
        assert_eq!(cfg.llm.temperature, Some(0.5));
        assert_eq!(cfg.llm.model, "gpt-4o");
    }

    #[test]
    fn empty_site_list_is_rejected() {
        let cfg: Config = toml::from_str("").expect("parse empty config");
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("No blog site"));
    }

    #[test]
    fn duplicate_site_ids_are_rejected() {
        let mut cfg: Config = toml::from_str(MINIMAL).expect("parse config");
        cfg.sites.push(cfg.sites[0].clone());
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate site id"));
    }

    #[test]
    fn inverted_pacing_is_rejected() {
        let mut cfg: Config = toml::from_str(MINIMAL).expect("parse config");
        cfg.pacing.min_delay_ms = 5000;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn invalid_listing_url_is_rejected() {
        let mut cfg: Config = toml::from_str(MINIMAL).expect("parse config");
        cfg.sites[0].listing_url = "not a url".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn retain_site_filters_and_rejects_unknown() {
        let mut cfg: Config = toml::from_str(MINIMAL).expect("parse config");
        let mut other = cfg.sites[0].clone();
        other.id = "other".to_string();
        cfg.sites.push(other);

        cfg.retain_site("other").expect("known site");
        assert_eq!(cfg.sites.len(), 1);
        assert_eq!(cfg.sites[0].id, "other");

        assert!(cfg.retain_site("missing").is_err());
    }

    #[tokio::test]
    async fn override_file_takes_precedence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");

        fs::write(&default_path, format!("{}\n[pacing]\nmin_delay_ms = 10\nmax_delay_ms = 20\n", MINIMAL))
            .expect("write default");
        fs::write(&override_path, "[pacing]\nmax_delay_ms = 50\n\n[platform]\ncollection_id = \"c-42\"\n")
            .expect("write override");

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load config");

        assert_eq!(cfg.sites.len(), 1);
        assert_eq!(cfg.pacing.min_delay_ms, 10);
        assert_eq!(cfg.pacing.max_delay_ms, 50);
        assert_eq!(cfg.platform.collection_id, "c-42");
        assert_eq!(cfg.platform.api_url, "https://api.webflow.com/v2");
    }

    #[test]
    fn reformulated_post_omits_missing_thumbnail() {
        let post = ReformulatedPost {
            title: "T".to_string(),
            html_content: "<p>x</p>".to_string(),
            thumbnail_url: None,
        };
        let json = serde_json::to_value(&post).expect("serialize");
        assert_eq!(json, serde_json::json!({ "title": "T", "htmlContent": "<p>x</p>" }));
    }

    #[test]
    fn resolve_secret_rejects_missing_variable() {
        let err = resolve_secret("SYNDICATOR_TEST_SURELY_UNSET_VARIABLE").unwrap_err();
        assert!(err.to_string().contains("is not set"));
    }
}
