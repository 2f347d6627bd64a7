use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub refresh: RefreshConfig,
    pub server: ServerConfig,
    pub output: OutputConfig,
}

/// Scraper configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_listing_url")]
    pub listing_url: String,

    #[serde(default = "default_summary_url")]
    pub summary_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Raw `Cookie` header for listings that need a signed-in session.
    #[serde(default)]
    pub cookie_header: Option<String>,
}

/// Refresh loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RefreshConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

/// Control-surface server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Idle window after which the event stream sends a synthetic ping.
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
}

/// Output artifact configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_listing_url() -> String {
    "https://www.32auctions.com/organizations/ORG_ID/auctions/AUCTION_ID?r=1&t=all".to_string()
}
fn default_summary_url() -> String {
    "https://www.32auctions.com/FRIENDLY_AUCTION_PATH".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_request_delay_ms() -> u64 {
    250
}
fn default_jitter_ms() -> u64 {
    250
}
fn default_max_retries() -> u32 {
    2
}
fn default_max_pages() -> u32 {
    50
}
fn default_user_agent() -> String {
    "bidwatch/0.1 (auction inventory monitor)".to_string()
}
fn default_interval_secs() -> u64 {
    10
}
fn default_bind() -> String {
    "0.0.0.0:8081".to_string()
}
fn default_keepalive_secs() -> u64 {
    15
}
fn default_output_path() -> PathBuf {
    PathBuf::from("auction_items.json")
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("BIDWATCH").separator("__"))
            .build()?;

        let app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|_| AppConfig::default());
        Ok(app_cfg)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig {
                listing_url: default_listing_url(),
                summary_url: default_summary_url(),
                timeout_secs: default_timeout_secs(),
                request_delay_ms: default_request_delay_ms(),
                jitter_ms: default_jitter_ms(),
                max_retries: default_max_retries(),
                max_pages: default_max_pages(),
                user_agent: default_user_agent(),
                cookie_header: None,
            },
            refresh: RefreshConfig {
                interval_secs: default_interval_secs(),
            },
            server: ServerConfig {
                bind: default_bind(),
                keepalive_secs: default_keepalive_secs(),
            },
            output: OutputConfig {
                path: default_output_path(),
            },
        }
    }
}
