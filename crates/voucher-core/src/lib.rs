//! Core library for turning receipt scans into cash vouchers.
//!
//! This crate provides:
//! - Image extraction from DOCX, PDF and plain image uploads
//! - Vision-language-model OCR with primary/fallback providers
//! - Recovery of a structured payload from free-form model output
//! - Bounded-concurrency batch OCR with progress reporting
//! - Mapping of OCR payloads to cash vouchers, including amounts in words

pub mod batch;
pub mod error;
pub mod files;
pub mod mapping;
pub mod models;
pub mod vlm;

pub use batch::{BatchProgress, BatchReport, BatchScheduler, OcrOutcome, OcrStatus, SourceImage};
pub use error::{FileError, OcrError, ProviderError, Result, VoucherError};
pub use files::{DocumentKind, RawImage, extract_images, optimize_image, prepare_for_upload};
pub use mapping::{amount_to_words, map_ocr_to_voucher, map_outcomes};
pub use models::{
    OcrPayload, OcrProvider, PaymentMethod, ProviderId, VoucherBook, VoucherConfig, VoucherRecord,
    VoucherUpdate,
};
pub use vlm::{FailoverClient, ImageRef, OcrService, VisionProvider, VlmResult, extract_payload};
