use std::time::Duration;

use serde::Deserialize;

/// Process configuration loaded from the environment (and `.env` if present).
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Confidence below this is a terminal failure.
    #[serde(default = "default_confidence_min")]
    pub confidence_min: f64,

    /// Confidence below this (but at or above the minimum) completes with a warning.
    #[serde(default = "default_confidence_warning")]
    pub confidence_warning: f64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Linear backoff unit: attempt `n` waits `n * retry_base_delay_ms`.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    #[serde(default = "default_cache_sweep_interval_ms")]
    pub cache_sweep_interval_ms: u64,

    #[serde(default = "default_job_retention_days")]
    pub job_retention_days: u32,

    #[serde(default = "default_job_sweep_interval_ms")]
    pub job_sweep_interval_ms: u64,

    /// Deadline for a single provider call.
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,

    /// Cloudflare account ID. Without it the provider is not configured.
    pub cf_account_id: Option<String>,

    /// Cloudflare Workers AI API token
    pub cf_api_token: Option<String>,

    /// Workers AI model path
    #[serde(default = "default_cf_model")]
    pub cf_model: String,

    /// R2 bucket holding uploaded photos
    pub r2_bucket: Option<String>,

    /// R2 access key ID (S3-compatible)
    pub r2_access_key: Option<String>,

    /// R2 secret access key (S3-compatible)
    pub r2_secret_key: Option<String>,

    /// R2 endpoint URL
    pub r2_endpoint: Option<String>,

    /// Prometheus scrape listener address
    #[serde(default = "default_metrics_addr")]
    pub metrics_addr: String,
}

fn default_confidence_min() -> f64 {
    0.7
}

fn default_confidence_warning() -> f64 {
    0.8
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    5_000
}

fn default_cache_ttl_ms() -> u64 {
    86_400_000
}

fn default_cache_sweep_interval_ms() -> u64 {
    3_600_000
}

fn default_job_retention_days() -> u32 {
    7
}

fn default_job_sweep_interval_ms() -> u64 {
    3_600_000
}

fn default_provider_timeout_ms() -> u64 {
    60_000
}

fn default_cf_model() -> String {
    "@cf/llava-hf/llava-1.5-7b-hf".to_string()
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9000".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Engine tuning extracted from the process configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            confidence: ConfidenceThresholds {
                min: self.confidence_min,
                warning: self.confidence_warning,
            },
            max_retries: self.max_retries,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
            cache_ttl: Duration::from_millis(self.cache_ttl_ms),
            // sweep timers cannot tick at a zero period
            cache_sweep_interval: Duration::from_millis(self.cache_sweep_interval_ms.max(1)),
            job_retention: chrono::Duration::days(i64::from(self.job_retention_days)),
            job_sweep_interval: Duration::from_millis(self.job_sweep_interval_ms.max(1)),
            provider_timeout: Duration::from_millis(self.provider_timeout_ms),
        }
    }

    /// Both Workers AI credentials, if configured.
    pub fn provider_credentials(&self) -> Option<(&str, &str)> {
        match (&self.cf_account_id, &self.cf_api_token) {
            (Some(account), Some(token)) if !account.is_empty() && !token.is_empty() => {
                Some((account.as_str(), token.as_str()))
            }
            _ => None,
        }
    }
}

/// Thresholds applied by the confidence gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceThresholds {
    pub min: f64,
    pub warning: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            min: default_confidence_min(),
            warning: default_confidence_warning(),
        }
    }
}

/// Tuning for a [`JobEngine`](crate::services::engine::JobEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub confidence: ConfidenceThresholds,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub cache_ttl: Duration,
    pub cache_sweep_interval: Duration,
    pub job_retention: chrono::Duration,
    pub job_sweep_interval: Duration,
    pub provider_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confidence: ConfidenceThresholds::default(),
            max_retries: default_max_retries(),
            retry_base_delay: Duration::from_millis(default_retry_base_delay_ms()),
            cache_ttl: Duration::from_millis(default_cache_ttl_ms()),
            cache_sweep_interval: Duration::from_millis(default_cache_sweep_interval_ms()),
            job_retention: chrono::Duration::days(i64::from(default_job_retention_days())),
            job_sweep_interval: Duration::from_millis(default_job_sweep_interval_ms()),
            provider_timeout: Duration::from_millis(default_provider_timeout_ms()),
        }
    }
}
