//! Data models: OCR payloads, vouchers and configuration.

pub mod book;
pub mod config;
pub mod payload;
pub mod voucher;

pub use book::VoucherBook;
pub use config::VoucherConfig;
pub use payload::{AdditionalFields, LineItem, OcrPayload};
pub use voucher::{OcrProvider, PaymentMethod, ProviderId, VoucherRecord, VoucherUpdate};
