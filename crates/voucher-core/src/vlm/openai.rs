//! Fallback provider: OpenAI chat completions with vision input.

use async_trait::async_trait;
use tracing::debug;

use super::chat::{self, ChatEndpoint};
use super::{ImageRef, VisionProvider};
use crate::error::ProviderError;
use crate::models::config::{OpenAiConfig, ProviderSettings, env};
use crate::models::voucher::ProviderId;

const PROVIDER: &str = "OpenAI";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o";

pub struct OpenAiProvider {
    settings: ProviderSettings,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(settings: ProviderSettings, client: reqwest::Client) -> Self {
        Self { settings, client }
    }

    /// Build from file tuning plus `OPENAI_*` environment variables.
    pub fn from_config(config: &OpenAiConfig, client: reqwest::Client) -> Self {
        Self::new(ProviderSettings::openai_from_env(config), client)
    }

    fn endpoint(&self) -> Result<ChatEndpoint, ProviderError> {
        let key = self
            .settings
            .api_key
            .clone()
            .ok_or(ProviderError::MissingConfig(env::OPENAI_API_KEY))?;
        let base = self.settings.host.as_deref().unwrap_or(DEFAULT_BASE_URL);

        Ok(ChatEndpoint {
            provider: PROVIDER,
            url: format!("{}/v1/chat/completions", base.trim_end_matches('/')),
            bearer: Some(key),
            model: self
                .settings
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            timeout: self.settings.timeout,
            detail: Some("high"),
        })
    }
}

#[async_trait]
impl VisionProvider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    async fn call(&self, image: &ImageRef) -> Result<String, ProviderError> {
        let endpoint = self.endpoint()?;
        debug!("OpenAI OCR request with {}", endpoint.model);
        chat::complete(&self.client, &endpoint, image).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vlm::chat::test_server::{self, Reply};
    use std::time::Duration;

    fn settings(key: Option<&str>, host: Option<&str>) -> ProviderSettings {
        ProviderSettings {
            host: host.map(String::from),
            model: None,
            api_key: key.map(String::from),
            timeout: Duration::from_secs(5),
            max_tokens: 4096,
            temperature: 0.1,
        }
    }

    #[tokio::test]
    async fn test_missing_key() {
        let provider = OpenAiProvider::new(settings(None, None), reqwest::Client::new());
        let err = provider
            .call(&ImageRef::parse("https://x/y.jpeg"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "OPENAI_API_KEY not configured");
        assert!(matches!(err, ProviderError::MissingConfig("OPENAI_API_KEY")));
    }

    #[test]
    fn test_endpoint_defaults() {
        let provider = OpenAiProvider::new(settings(Some("sk-test"), None), reqwest::Client::new());
        let endpoint = provider.endpoint().unwrap();

        assert_eq!(endpoint.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(endpoint.model, "gpt-4o");
        assert_eq!(endpoint.bearer.as_deref(), Some("sk-test"));
        assert_eq!(endpoint.detail, Some("high"));
    }

    #[tokio::test]
    async fn test_status_error_names_provider() {
        let base = test_server::serve(Reply::Respond {
            status: 401,
            body: r#"{"error": "invalid key"}"#.to_string(),
        })
        .await;

        let provider = OpenAiProvider::new(settings(Some("sk-bad"), Some(&base)), reqwest::Client::new());
        let err = provider
            .call(&ImageRef::parse("https://x/y.jpeg"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), r#"OpenAI API error 401: {"error": "invalid key"}"#);
        assert!(matches!(err, ProviderError::Status { status: 401, .. }));
    }
}
