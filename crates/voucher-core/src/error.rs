//! Error types for the voucher-core library.

use std::time::Duration;

use thiserror::Error;

/// Main error type for the voucher library.
#[derive(Error, Debug)]
pub enum VoucherError {
    /// Document or image handling error.
    #[error("file error: {0}")]
    File(#[from] FileError),

    /// Provider adapter error.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// OCR pipeline error (after failover).
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised by a single vision provider call.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// A required configuration value is not set.
    #[error("{0} not configured")]
    MissingConfig(&'static str),

    /// The endpoint answered with a non-success status.
    #[error("{provider} API error {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// The request never produced a response.
    #[error("{provider} request failed: {source}")]
    Network {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The deadline expired and the in-flight request was dropped.
    #[error("{provider} request timed out after {}ms", after.as_millis())]
    Timeout {
        provider: &'static str,
        after: Duration,
    },

    /// Success status but no message content.
    #[error("{provider} returned empty response")]
    EmptyResponse { provider: &'static str },

    /// Success status but the body is not a chat completion.
    #[error("{provider} returned malformed response: {source}")]
    Malformed {
        provider: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Errors from the failover OCR client.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Primary and fallback both failed.
    #[error("Both VLM providers failed. Last error: {last_error}")]
    AllProvidersFailed { last_error: String },
}

/// Errors related to document image extraction and optimisation.
#[derive(Error, Debug)]
pub enum FileError {
    /// The file extension is not one we can extract images from.
    #[error("unsupported file type: .{0}")]
    UnsupportedType(String),

    /// DOCX container could not be read.
    #[error("failed to read DOCX archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// PDF could not be parsed.
    #[error("failed to parse PDF: {0}")]
    Pdf(String),

    /// The PDF is encrypted with a non-empty password.
    #[error("PDF is encrypted")]
    Encrypted,

    /// Image decoding or encoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error while reading an archive entry.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the voucher library.
pub type Result<T> = std::result::Result<T, VoucherError>;
