//! OCR payload to cash voucher mapping.

use lazy_static::lazy_static;
use regex::Regex;

use super::words::{parse_amount, to_words};
use crate::batch::{OcrOutcome, OcrStatus};
use crate::models::payload::OcrPayload;
use crate::models::voucher::{ProviderId, VoucherRecord};

lazy_static! {
    static ref WORDS_KEY: Regex = Regex::new(r"(?i)word|written").unwrap();
    static ref PURPOSE_KEY: Regex = Regex::new(r"(?i)purpose|description|being|reason|for").unwrap();
    static ref DEBIT_KEY: Regex = Regex::new(r"(?i)debit|expense|category|account|head").unwrap();
}

/// Build a voucher from one OCR payload.
///
/// Never fails; fields with no source stay empty. The voucher number is
/// always left for finance to assign.
pub fn map_ocr_to_voucher(
    payload: &OcrPayload,
    source_image_url: &str,
    source_file_name: &str,
    provider: ProviderId,
) -> VoucherRecord {
    let amount = clean_amount(&payload.amount);
    let extras = &payload.additional_fields;

    let rs_in_words = extras
        .find_value(|key| WORDS_KEY.is_match(key))
        .map(str::to_string)
        .unwrap_or_else(|| match parse_amount(&amount) {
            Some(value) => to_words(value),
            None => payload.amount.clone(),
        });

    let mut voucher = VoucherRecord::from_ocr(payload.clone(), provider);
    voucher.source_image_url = source_image_url.to_string();
    voucher.source_file_name = source_file_name.to_string();
    voucher.date = payload.date.clone();
    voucher.amount = amount;
    voucher.pay_to = payload.to_account.clone();
    voucher.rs_in_words = rs_in_words;
    voucher.being = purpose(payload);
    voucher.and_debit = extras
        .find_value(|key| DEBIT_KEY.is_match(key))
        .unwrap_or_default()
        .to_string();
    voucher.authorised_by = payload.from_account.clone();

    voucher
}

/// Vouchers for every successful outcome, in outcome order.
pub fn map_outcomes(outcomes: &[OcrOutcome]) -> Vec<VoucherRecord> {
    outcomes
        .iter()
        .filter_map(|outcome| match &outcome.status {
            OcrStatus::Success { payload, provider } => Some(map_ocr_to_voucher(
                payload,
                outcome.image.as_str(),
                &outcome.image_name,
                *provider,
            )),
            OcrStatus::Failure { .. } => None,
        })
        .collect()
}

/// Keep digits and the separators `.,/-`.
pub fn clean_amount(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '/' | '-'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn purpose(payload: &OcrPayload) -> String {
    let labels: Vec<&str> = payload
        .line_items
        .iter()
        .map(|item| item.label.as_str())
        .filter(|label| !label.trim().is_empty())
        .collect();

    if !labels.is_empty() {
        return labels.join(", ");
    }

    payload
        .additional_fields
        .find_value(|key| PURPOSE_KEY.is_match(key))
        .map(str::to_string)
        .unwrap_or_else(|| payload.receipt_type.clone())
}
