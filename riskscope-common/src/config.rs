//! Configuration management for riskscope services.
//!
//! Services share a configuration file at `~/.riskscope/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (RISKSCOPE_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `RISKSCOPE_PORT` → service.port
//! - `RISKSCOPE_BIND_ADDRESS` → network.bind
//! - `RISKSCOPE_LOG_LEVEL` → observability.log_level
//! - `RISKSCOPE_LOG_FORMAT` → observability.log_format
//! - `RISKSCOPE_PROVIDER_ENDPOINT` → providers.endpoint (switches mode to `http`)

use crate::error::{Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".riskscope"),
        |dirs| dirs.home_dir().join(".riskscope"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Network / Service
// ============================================================================

/// Global network configuration.
///
/// Default bind is `127.0.0.1` (local only). Set to `0.0.0.0` to allow remote access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_bind_address")]
    pub bind: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
        }
    }
}

/// HTTP service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Port the assessment API listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum accepted request body in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

// ============================================================================
// Analysis
// ============================================================================

/// Signal weight vector used by the risk aggregator.
///
/// Weights must be non-negative and sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WeightsConfig {
    #[serde(default = "default_sentiment_weight")]
    pub sentiment: f64,
    #[serde(default = "default_controversy_weight")]
    pub controversy: f64,
    #[serde(default = "default_audience_weight")]
    pub audience: f64,
    #[serde(default = "default_trend_weight")]
    pub trend: f64,
}

impl WeightsConfig {
    /// Sum of all four weights.
    pub fn total(&self) -> f64 {
        self.sentiment + self.controversy + self.audience + self.trend
    }
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            sentiment: default_sentiment_weight(),
            controversy: default_controversy_weight(),
            audience: default_audience_weight(),
            trend: default_trend_weight(),
        }
    }
}

/// Analysis pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Signal weights
    #[serde(default)]
    pub weights: WeightsConfig,

    /// Timeout for sentiment/controversy and text-only audience/trend calls
    #[serde(default = "default_fast_timeout_secs")]
    pub fast_timeout_secs: u64,

    /// Timeout for audience/trend calls on media-heavy content
    #[serde(default = "default_media_timeout_secs")]
    pub media_timeout_secs: u64,

    /// Overall deadline for collecting all signals of one job
    #[serde(default = "default_job_deadline_secs")]
    pub job_deadline_secs: u64,

    /// Shared worker pool capacity (concurrent analyzer calls across jobs)
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            weights: WeightsConfig::default(),
            fast_timeout_secs: default_fast_timeout_secs(),
            media_timeout_secs: default_media_timeout_secs(),
            job_deadline_secs: default_job_deadline_secs(),
            worker_pool_size: default_worker_pool_size(),
        }
    }
}

/// Recommendation engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationsConfig {
    /// Minimum weighted impact for a factor to produce targeted suggestions
    #[serde(default = "default_min_factor_impact")]
    pub min_factor_impact: f64,

    /// Controversy dimension score at which a dimension is acted upon
    #[serde(default = "default_dimension_threshold")]
    pub dimension_threshold: f64,

    /// Upper bound on returned recommendations (never below the category minimum)
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
}

impl Default for RecommendationsConfig {
    fn default() -> Self {
        Self {
            min_factor_impact: default_min_factor_impact(),
            dimension_threshold: default_dimension_threshold(),
            max_recommendations: default_max_recommendations(),
        }
    }
}

// ============================================================================
// Providers
// ============================================================================

/// Where signal providers run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// Deterministic in-process lexicon providers
    #[default]
    Local,
    /// Remote model host reached over HTTP
    Http,
}

/// Signal provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub mode: ProviderMode,

    /// Base URL of the model host (required in `http` mode)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Per-request HTTP timeout
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first failed attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff between retries
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            mode: ProviderMode::default(),
            endpoint: None,
            timeout_secs: default_provider_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

// ============================================================================
// Observability
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets forced to `warn`
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub recommendations: RecommendationsConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .context(format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("RISKSCOPE_PORT") {
            if let Ok(p) = port.parse() {
                self.service.port = p;
            }
        }

        if let Some(bind) = lookup("RISKSCOPE_BIND_ADDRESS") {
            self.network.bind = bind;
        }

        if let Some(level) = lookup("RISKSCOPE_LOG_LEVEL") {
            self.observability.log_level = level;
        }

        if let Some(format) = lookup("RISKSCOPE_LOG_FORMAT") {
            self.observability.log_format = format;
        }

        if let Some(endpoint) = lookup("RISKSCOPE_PROVIDER_ENDPOINT") {
            self.providers.endpoint = Some(endpoint);
            self.providers.mode = ProviderMode::Http;
        }
    }

    /// Socket address string the service binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.network.bind, self.service.port)
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    4460
}
fn default_body_limit() -> usize {
    1024 * 1024
}
fn default_sentiment_weight() -> f64 {
    0.25
}
fn default_controversy_weight() -> f64 {
    0.35
}
fn default_audience_weight() -> f64 {
    0.25
}
fn default_trend_weight() -> f64 {
    0.15
}
fn default_fast_timeout_secs() -> u64 {
    30
}
fn default_media_timeout_secs() -> u64 {
    120
}
fn default_job_deadline_secs() -> u64 {
    150
}
fn default_worker_pool_size() -> usize {
    32
}
fn default_min_factor_impact() -> f64 {
    1.0
}
fn default_dimension_threshold() -> f64 {
    40.0
}
fn default_max_recommendations() -> usize {
    10
}
fn default_provider_timeout_secs() -> u64 {
    25
}
fn default_max_retries() -> u32 {
    2
}
fn default_retry_backoff_ms() -> u64 {
    500
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "pretty".into()
}
