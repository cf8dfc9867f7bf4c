//! Primary/fallback OCR client.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::extract::extract_payload;
use super::{ImageRef, OcrService, OpenAiProvider, QwenProvider, VisionProvider, VlmResult};
use crate::error::{OcrError, ProviderError};
use crate::models::config::ProvidersConfig;
use crate::models::voucher::ProviderId;

/// Characters of raw model output included in debug logs.
const RAW_PREVIEW_CHARS: usize = 300;

/// Tries the primary provider once, then the fallback once.
///
/// Any primary failure falls through, including a missing configuration.
pub struct FailoverClient {
    primary: Box<dyn VisionProvider>,
    fallback: Box<dyn VisionProvider>,
}

impl FailoverClient {
    pub fn new(primary: Box<dyn VisionProvider>, fallback: Box<dyn VisionProvider>) -> Self {
        Self { primary, fallback }
    }

    /// Qwen primary and OpenAI fallback sharing one HTTP client.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("voucher/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        Ok(Self::new(
            Box::new(QwenProvider::from_config(&config.qwen, client.clone())),
            Box::new(OpenAiProvider::from_config(&config.openai, client)),
        ))
    }

    async fn attempt(
        provider: &dyn VisionProvider,
        image: &ImageRef,
    ) -> Result<VlmResult, AttemptError> {
        let id = provider.id();
        let raw = provider.call(image).await.map_err(AttemptError::Provider)?;
        debug!(
            "{} raw output: {}",
            id,
            raw.chars().take(RAW_PREVIEW_CHARS).collect::<String>()
        );

        match extract_payload(&raw) {
            Some(payload) => Ok(VlmResult {
                payload,
                provider: id,
            }),
            None => Err(AttemptError::Unparseable(provider_label(id))),
        }
    }
}

fn provider_label(id: ProviderId) -> &'static str {
    match id {
        ProviderId::Qwen => "Qwen",
        ProviderId::OpenAi => "OpenAI",
    }
}

enum AttemptError {
    Provider(ProviderError),
    Unparseable(&'static str),
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::Provider(e) => write!(f, "{}", e),
            AttemptError::Unparseable(name) => {
                write!(f, "{} returned unparseable JSON response", name)
            }
        }
    }
}

#[async_trait]
impl OcrService for FailoverClient {
    async fn ocr(&self, image: &ImageRef) -> Result<VlmResult, OcrError> {
        let primary_error = match Self::attempt(self.primary.as_ref(), image).await {
            Ok(result) => {
                info!("OCR succeeded via {}", result.provider);
                return Ok(result);
            }
            Err(e) => e,
        };

        warn!(
            "{} failed ({}), falling back to {}",
            self.primary.id(),
            primary_error,
            self.fallback.id()
        );

        match Self::attempt(self.fallback.as_ref(), image).await {
            Ok(result) => {
                info!("OCR succeeded via {}", result.provider);
                Ok(result)
            }
            Err(e) => Err(OcrError::AllProvidersFailed {
                last_error: e.to_string(),
            }),
        }
    }
}
