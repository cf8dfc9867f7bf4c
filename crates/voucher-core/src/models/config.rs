//! Configuration structures for the voucher pipeline.
//!
//! Non-secret tuning lives in a JSON file. Provider endpoints and credentials
//! come from the process environment and are layered on top by
//! [`ProviderSettings::qwen_from_env`] and
//! [`ProviderSettings::openai_from_env`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Main configuration for the voucher pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoucherConfig {
    /// Vision provider configuration.
    pub providers: ProvidersConfig,

    /// Batch OCR configuration.
    pub batch: BatchConfig,

    /// Image extraction and optimisation configuration.
    pub images: ImageConfig,
}

/// Both vision providers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Primary provider (self-hosted Qwen VL behind vLLM).
    pub qwen: QwenConfig,

    /// Fallback provider (OpenAI).
    pub openai: OpenAiConfig,
}

/// Qwen provider tuning. Host and model come from `VLLM_HOST` / `VLLM_MODEL`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QwenConfig {
    /// Request deadline in milliseconds.
    pub timeout_ms: u64,

    /// Output token ceiling.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for QwenConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 12_000,
            max_tokens: 4096,
            temperature: 0.1,
        }
    }
}

/// OpenAI provider tuning. The API key only ever comes from `OPENAI_API_KEY`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API base URL (without `/v1/...`).
    pub base_url: String,

    /// Model identifier.
    pub model: String,

    /// Request deadline in milliseconds.
    pub timeout_ms: u64,

    /// Output token ceiling.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o".to_string(),
            timeout_ms: 60_000,
            max_tokens: 4096,
            temperature: 0.1,
        }
    }
}

/// Batch scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of concurrent OCR workers.
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { concurrency: 3 }
    }
}

/// Image extraction and optimisation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Longest side after optimisation, in pixels.
    pub max_dimension: u32,

    /// JPEG quality of optimised uploads (1-100).
    pub jpeg_quality: u8,

    /// JPEG quality used when re-encoding raw PDF image streams.
    pub pdf_jpeg_quality: u8,

    /// PDF images with either side below this are treated as decoration.
    pub min_pdf_image_side: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1536,
            jpeg_quality: 85,
            pdf_jpeg_quality: 90,
            min_pdf_image_side: 50,
        }
    }
}

impl VoucherConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

/// Resolved settings for one OpenAI-compatible endpoint.
///
/// Required values stay `None` when unset; the adapter reports them as
/// missing on first use.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub host: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Environment variable names read by the `*_from_env` constructors.
pub mod env {
    pub const VLLM_HOST: &str = "VLLM_HOST";
    pub const VLLM_MODEL: &str = "VLLM_MODEL";
    pub const VLM_TIMEOUT_MS: &str = "VLM_TIMEOUT_MS";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const OPENAI_MODEL: &str = "OPENAI_MODEL";
    pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
    pub const OPENAI_TIMEOUT_MS: &str = "OPENAI_TIMEOUT_MS";

    /// Variables that must be present for both providers to work.
    pub const REQUIRED: [&str; 3] = [VLLM_HOST, VLLM_MODEL, OPENAI_API_KEY];
}

impl ProviderSettings {
    /// Qwen settings from `VLLM_*` variables over the file configuration.
    pub fn qwen_from_env(config: &QwenConfig) -> Self {
        Self::qwen_from_lookup(config, |key| std::env::var(key).ok())
    }

    /// OpenAI settings from `OPENAI_*` variables over the file configuration.
    pub fn openai_from_env(config: &OpenAiConfig) -> Self {
        Self::openai_from_lookup(config, |key| std::env::var(key).ok())
    }

    fn qwen_from_lookup(config: &QwenConfig, lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: non_empty(lookup(env::VLLM_HOST)),
            model: non_empty(lookup(env::VLLM_MODEL)),
            api_key: None,
            timeout: timeout_from(lookup(env::VLM_TIMEOUT_MS), env::VLM_TIMEOUT_MS, config.timeout_ms),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    fn openai_from_lookup(config: &OpenAiConfig, lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: non_empty(lookup(env::OPENAI_BASE_URL)).or_else(|| non_empty(Some(config.base_url.clone()))),
            model: non_empty(lookup(env::OPENAI_MODEL)).or_else(|| non_empty(Some(config.model.clone()))),
            api_key: non_empty(lookup(env::OPENAI_API_KEY)),
            timeout: timeout_from(lookup(env::OPENAI_TIMEOUT_MS), env::OPENAI_TIMEOUT_MS, config.timeout_ms),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn timeout_from(raw: Option<String>, key: &str, default_ms: u64) -> Duration {
    let ms = match raw {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(ms) => ms,
            Err(_) => {
                warn!("Ignoring invalid {}={:?}, using {}ms", key, raw, default_ms);
                default_ms
            }
        },
        None => default_ms,
    };
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_qwen_settings_from_env() {
        let settings = ProviderSettings::qwen_from_lookup(
            &QwenConfig::default(),
            lookup(&[
                ("VLLM_HOST", "http://gpu:8000/"),
                ("VLLM_MODEL", "Qwen/Qwen2.5-VL-7B-Instruct"),
                ("VLM_TIMEOUT_MS", "5000"),
            ]),
        );

        assert_eq!(settings.host.as_deref(), Some("http://gpu:8000/"));
        assert_eq!(settings.model.as_deref(), Some("Qwen/Qwen2.5-VL-7B-Instruct"));
        assert_eq!(settings.timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_missing_values_stay_unset() {
        let settings = ProviderSettings::qwen_from_lookup(
            &QwenConfig::default(),
            lookup(&[("VLLM_HOST", "  ")]),
        );

        assert!(settings.host.is_none());
        assert!(settings.model.is_none());
        assert_eq!(settings.timeout, Duration::from_millis(12_000));
    }

    #[test]
    fn test_invalid_timeout_falls_back_to_config() {
        let settings = ProviderSettings::openai_from_lookup(
            &OpenAiConfig::default(),
            lookup(&[("OPENAI_API_KEY", "sk-test"), ("OPENAI_TIMEOUT_MS", "soon")]),
        );

        assert_eq!(settings.timeout, Duration::from_millis(60_000));
        assert_eq!(settings.api_key.as_deref(), Some("sk-test"));
        assert_eq!(settings.host.as_deref(), Some("https://api.openai.com"));
        assert_eq!(settings.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn test_config_defaults_roundtrip_through_partial_json() {
        let config: VoucherConfig =
            serde_json::from_str(r#"{"batch": {"concurrency": 5}}"#).unwrap();

        assert_eq!(config.batch.concurrency, 5);
        assert_eq!(config.images.max_dimension, 1536);
        assert_eq!(config.providers.qwen.timeout_ms, 12_000);
    }
}
