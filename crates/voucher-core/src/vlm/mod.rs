//! Vision-language-model OCR: provider adapters, payload recovery and failover.

mod chat;
mod client;
mod extract;
mod openai;
mod prompt;
mod qwen;

pub use client::FailoverClient;
pub use extract::extract_payload;
pub use openai::OpenAiProvider;
pub use prompt::OCR_PROMPT;
pub use qwen::QwenProvider;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;

use crate::error::{OcrError, ProviderError};
use crate::models::payload::OcrPayload;
use crate::models::voucher::ProviderId;

/// Image handed to a vision model: an inline data URI or a fetchable URL.
#[derive(Clone, PartialEq, Eq)]
pub enum ImageRef {
    DataUri(String),
    Url(String),
}

impl ImageRef {
    /// Encode raw bytes as a `data:` URI.
    pub fn from_bytes(data: &[u8], mime_type: &str) -> Self {
        ImageRef::DataUri(format!(
            "data:{};base64,{}",
            mime_type,
            BASE64_STANDARD.encode(data)
        ))
    }

    /// Classify an existing reference string.
    pub fn parse(reference: impl Into<String>) -> Self {
        let reference = reference.into();
        if reference.starts_with("data:") {
            ImageRef::DataUri(reference)
        } else {
            ImageRef::Url(reference)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ImageRef::DataUri(uri) => uri,
            ImageRef::Url(url) => url,
        }
    }
}

impl std::fmt::Debug for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageRef::DataUri(uri) => {
                let header = uri.split(',').next().unwrap_or("data:");
                write!(f, "DataUri({},… {} chars)", header, uri.len())
            }
            ImageRef::Url(url) => write!(f, "Url({})", url),
        }
    }
}

/// One hosted vision model that turns an image into raw text.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Identity reported on successful outcomes.
    fn id(&self) -> ProviderId;

    /// Send one OCR request and return the model's raw text.
    async fn call(&self, image: &ImageRef) -> Result<String, ProviderError>;
}

/// Structured OCR result with the provider that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct VlmResult {
    pub payload: OcrPayload,
    pub provider: ProviderId,
}

/// Anything that can OCR a single image into a payload.
#[async_trait]
pub trait OcrService: Send + Sync {
    async fn ocr(&self, image: &ImageRef) -> Result<VlmResult, OcrError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri_from_bytes() {
        let image = ImageRef::from_bytes(b"\xff\xd8\xff", "image/jpeg");
        assert_eq!(image.as_str(), "data:image/jpeg;base64,/9j/");
        assert!(matches!(image, ImageRef::DataUri(_)));
    }

    #[test]
    fn test_parse_reference() {
        assert!(matches!(
            ImageRef::parse("https://blob.example/receipt.jpeg"),
            ImageRef::Url(_)
        ));
        assert!(matches!(
            ImageRef::parse("data:image/png;base64,AAAA"),
            ImageRef::DataUri(_)
        ));
    }

    #[test]
    fn test_debug_hides_image_data() {
        let image = ImageRef::from_bytes(&[0u8; 64], "image/jpeg");
        let debug = format!("{:?}", image);
        assert!(debug.starts_with("DataUri(data:image/jpeg;base64"));
        assert!(!debug.contains("AAAA"));
    }
}
