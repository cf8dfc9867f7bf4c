//! Turning OCR payloads into cash vouchers.

pub mod mapper;
pub mod words;

pub use mapper::{clean_amount, map_ocr_to_voucher, map_outcomes};
pub use words::{amount_to_words, parse_amount, to_words};
