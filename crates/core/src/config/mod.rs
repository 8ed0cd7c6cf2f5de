//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PRODEX_*, nested keys split on `__`)
//! 2. TOML config file (if PRODEX_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The loaded value is built once at process start and handed to the fetcher
//! and engine by reference; nothing reads the environment after that.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Curated pool of realistic browser/OS user agents.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36 Edg/119.0.0.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Linux; Android 13; SM-G991B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 12; Pixel 6) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (PRODEX_*)
/// 2. TOML config file (if PRODEX_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via PRODEX_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Per-attempt HTTP timeout in milliseconds.
    ///
    /// Set via PRODEX_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to accept per response body.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Days a cached record stays valid.
    ///
    /// Set via PRODEX_CACHE_TTL_DAYS environment variable.
    #[serde(default = "default_cache_ttl_days")]
    pub cache_ttl_days: i64,

    /// User agents rotated across fetch attempts.
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,

    /// Seed for user-agent and proxy selection. Unset means entropy-seeded.
    #[serde(default)]
    pub user_agent_seed: Option<u64>,

    #[serde(default)]
    pub proxy: ProxyConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub bot: BotConfig,

    #[serde(default)]
    pub augment: AugmentConfig,
}

/// Outbound proxy settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub http_proxy: Option<String>,
    #[serde(default)]
    pub https_proxy: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// When non-empty, one proxy is picked at random per attempt and used for both schemes.
    #[serde(default)]
    pub proxy_list: Vec<String>,
}

/// External JavaScript-rendering proxy, used only for `domains`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_render_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    /// Domain suffixes routed through the render proxy.
    #[serde(default = "default_render_domains")]
    pub domains: Vec<String>,
    #[serde(default = "default_render_timeout_ms")]
    pub timeout_ms: u64,
    /// Extra query parameters sent with every render request.
    #[serde(default = "default_render_params")]
    pub params: BTreeMap<String, String>,
}

/// Bot-mitigation redirect heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_true")]
    pub follow_redirects: bool,
    /// Bodies smaller than this are treated as suspicious.
    #[serde(default = "default_small_body_bytes")]
    pub small_body_bytes: usize,
    /// Substring marking a verification redirect target.
    #[serde(default = "default_bot_marker")]
    pub marker: String,
    #[serde(default = "default_redirect_delay_ms")]
    pub redirect_delay_ms: u64,
}

/// When a brand cascade augments its first tier with selector harvesting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AugmentConfig {
    /// Augment when fewer images than this were found.
    #[serde(default = "default_min_images")]
    pub min_images: usize,
    /// Augment when no sizes were found.
    #[serde(default = "default_true")]
    pub require_sizes: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./prodex-cache.sqlite")
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_cache_ttl_days() -> i64 {
    3
}

fn default_user_agents() -> Vec<String> {
    DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect()
}

fn default_render_base_url() -> String {
    "http://api.scrape.do/".into()
}

fn default_render_domains() -> Vec<String> {
    vec!["zara.com".into()]
}

fn default_render_timeout_ms() -> u64 {
    60_000
}

fn default_render_params() -> BTreeMap<String, String> {
    [("render", "true"), ("super", "true"), ("blockResources", "false")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn default_small_body_bytes() -> usize {
    5_000
}

fn default_bot_marker() -> String {
    "bm-verify".into()
}

fn default_redirect_delay_ms() -> u64 {
    2_000
}

fn default_min_images() -> usize {
    3
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            cache_ttl_days: default_cache_ttl_days(),
            user_agents: default_user_agents(),
            user_agent_seed: None,
            proxy: ProxyConfig::default(),
            render: RenderConfig::default(),
            bot: BotConfig::default(),
            augment: AugmentConfig::default(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_render_base_url(),
            api_token: None,
            domains: default_render_domains(),
            timeout_ms: default_render_timeout_ms(),
            params: default_render_params(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            follow_redirects: true,
            small_body_bytes: default_small_body_bytes(),
            marker: default_bot_marker(),
            redirect_delay_ms: default_redirect_delay_ms(),
        }
    }
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self { min_images: default_min_images(), require_sizes: true }
    }
}

impl AppConfig {
    /// Per-attempt timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Cache TTL as a chrono duration.
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.cache_ttl_days)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `PRODEX_`
    /// 2. TOML file from `PRODEX_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// The layered figment `load` extracts from.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("PRODEX_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("PRODEX_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    /// Extract and validate a configuration from an arbitrary figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The render-proxy token, if rendering is enabled.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if rendering is enabled without a token.
    pub fn require_render_token(&self) -> Result<&str, ConfigError> {
        self.render.api_token.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "render.api_token".into(),
            hint: "Set PRODEX_RENDER__API_TOKEN environment variable".into(),
        })
    }
}
