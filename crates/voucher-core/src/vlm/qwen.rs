//! Primary provider: Qwen VL served by vLLM's OpenAI-compatible API.

use async_trait::async_trait;
use tracing::debug;

use super::chat::{self, ChatEndpoint};
use super::{ImageRef, VisionProvider};
use crate::error::ProviderError;
use crate::models::config::{ProviderSettings, QwenConfig, env};
use crate::models::voucher::ProviderId;

const PROVIDER: &str = "Qwen";

/// Self-hosted Qwen VL adapter. No authentication is sent.
pub struct QwenProvider {
    settings: ProviderSettings,
    client: reqwest::Client,
}

impl QwenProvider {
    pub fn new(settings: ProviderSettings, client: reqwest::Client) -> Self {
        Self { settings, client }
    }

    /// Build from file tuning plus `VLLM_*` environment variables.
    pub fn from_config(config: &QwenConfig, client: reqwest::Client) -> Self {
        Self::new(ProviderSettings::qwen_from_env(config), client)
    }

    fn endpoint(&self) -> Result<ChatEndpoint, ProviderError> {
        let host = self
            .settings
            .host
            .as_deref()
            .ok_or(ProviderError::MissingConfig(env::VLLM_HOST))?;
        let model = self
            .settings
            .model
            .clone()
            .ok_or(ProviderError::MissingConfig(env::VLLM_MODEL))?;

        Ok(ChatEndpoint {
            provider: PROVIDER,
            url: format!("{}/v1/chat/completions", host.trim_end_matches('/')),
            bearer: None,
            model,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            timeout: self.settings.timeout,
            detail: None,
        })
    }
}

#[async_trait]
impl VisionProvider for QwenProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Qwen
    }

    async fn call(&self, image: &ImageRef) -> Result<String, ProviderError> {
        let endpoint = self.endpoint()?;
        debug!("Qwen OCR request, timeout {:?}", endpoint.timeout);
        chat::complete(&self.client, &endpoint, image).await
    }
}
