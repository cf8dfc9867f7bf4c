//! Cash voucher data model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::payload::OcrPayload;

/// Vision provider that produced an OCR payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Self-hosted Qwen VL (primary).
    Qwen,
    /// OpenAI GPT-4o (fallback).
    #[serde(rename = "openai")]
    OpenAi,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Qwen => "qwen",
            ProviderId::OpenAi => "openai",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a voucher's field values came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrProvider {
    Qwen,
    #[serde(rename = "openai")]
    OpenAi,
    /// Typed in by hand, no OCR payload.
    Manual,
}

impl OcrProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrProvider::Qwen => "qwen",
            OcrProvider::OpenAi => "openai",
            OcrProvider::Manual => "manual",
        }
    }
}

impl From<ProviderId> for OcrProvider {
    fn from(provider: ProviderId) -> Self {
        match provider {
            ProviderId::Qwen => OcrProvider::Qwen,
            ProviderId::OpenAi => OcrProvider::OpenAi,
        }
    }
}

/// How the voucher amount was paid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Bank,
    Cheque,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Bank => "bank",
            PaymentMethod::Cheque => "cheque",
        }
    }
}

/// The canonical cash voucher form.
///
/// Identity and provenance are fixed at construction: `ocr_provider` is
/// [`OcrProvider::Manual`] exactly when there is no raw OCR payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "UncheckedVoucher")]
pub struct VoucherRecord {
    id: Uuid,

    /// Image the voucher was read from (data URI or URL), empty for manual entries.
    pub source_image_url: String,

    /// File name of the source image.
    pub source_file_name: String,

    /// Finance-assigned serial. Never inferred from OCR.
    pub voucher_no: String,

    pub date: String,

    /// Plain numeric amount, currency symbols stripped.
    pub amount: String,

    pub pay_to: String,

    /// Amount written out in words.
    pub rs_in_words: String,

    /// Purpose of the payment.
    pub being: String,

    /// Debit head / expense category.
    pub and_debit: String,

    pub authorised_by: String,

    pub paid_by_method: PaymentMethod,

    /// Print the source image alongside the voucher.
    pub attach_source: bool,

    ocr_provider: OcrProvider,

    raw_ocr_data: Option<OcrPayload>,
}

impl VoucherRecord {
    /// A blank voucher for manual entry.
    pub fn manual() -> Self {
        Self::with_origin(OcrProvider::Manual, None)
    }

    /// A blank voucher that keeps `payload` for audit.
    pub fn from_ocr(payload: OcrPayload, provider: ProviderId) -> Self {
        Self::with_origin(provider.into(), Some(payload))
    }

    fn with_origin(ocr_provider: OcrProvider, raw_ocr_data: Option<OcrPayload>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_image_url: String::new(),
            source_file_name: String::new(),
            voucher_no: String::new(),
            date: String::new(),
            amount: String::new(),
            pay_to: String::new(),
            rs_in_words: String::new(),
            being: String::new(),
            and_debit: String::new(),
            authorised_by: String::new(),
            paid_by_method: PaymentMethod::Cash,
            attach_source: false,
            ocr_provider,
            raw_ocr_data,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn ocr_provider(&self) -> OcrProvider {
        self.ocr_provider
    }

    pub fn raw_ocr_data(&self) -> Option<&OcrPayload> {
        self.raw_ocr_data.as_ref()
    }

    /// Apply a user edit. Fields left as `None` are untouched.
    pub fn apply(&mut self, update: VoucherUpdate) {
        let VoucherUpdate {
            voucher_no,
            date,
            amount,
            pay_to,
            rs_in_words,
            being,
            and_debit,
            authorised_by,
            paid_by_method,
            attach_source,
        } = update;

        if let Some(v) = voucher_no {
            self.voucher_no = v;
        }
        if let Some(v) = date {
            self.date = v;
        }
        if let Some(v) = amount {
            self.amount = v;
        }
        if let Some(v) = pay_to {
            self.pay_to = v;
        }
        if let Some(v) = rs_in_words {
            self.rs_in_words = v;
        }
        if let Some(v) = being {
            self.being = v;
        }
        if let Some(v) = and_debit {
            self.and_debit = v;
        }
        if let Some(v) = authorised_by {
            self.authorised_by = v;
        }
        if let Some(v) = paid_by_method {
            self.paid_by_method = v;
        }
        if let Some(v) = attach_source {
            self.attach_source = v;
        }
    }

    /// Check the editable fields a printed voucher needs and return any gaps.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.voucher_no.is_empty() {
            issues.push("Missing voucher number".to_string());
        }
        if self.amount.is_empty() {
            issues.push("Missing amount".to_string());
        }
        if self.pay_to.is_empty() {
            issues.push("Missing payee".to_string());
        }
        if self.date.is_empty() {
            issues.push("Missing date".to_string());
        }

        issues
    }
}

impl Default for VoucherRecord {
    fn default() -> Self {
        Self::manual()
    }
}

/// A partial edit of a voucher's editable fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoucherUpdate {
    pub voucher_no: Option<String>,
    pub date: Option<String>,
    pub amount: Option<String>,
    pub pay_to: Option<String>,
    pub rs_in_words: Option<String>,
    pub being: Option<String>,
    pub and_debit: Option<String>,
    pub authorised_by: Option<String>,
    pub paid_by_method: Option<PaymentMethod>,
    pub attach_source: Option<bool>,
}

/// Wire shape of [`VoucherRecord`] before the provenance check.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UncheckedVoucher {
    id: Uuid,
    #[serde(default)]
    source_image_url: String,
    #[serde(default)]
    source_file_name: String,
    #[serde(default)]
    voucher_no: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    amount: String,
    #[serde(default)]
    pay_to: String,
    #[serde(default)]
    rs_in_words: String,
    #[serde(default)]
    being: String,
    #[serde(default)]
    and_debit: String,
    #[serde(default)]
    authorised_by: String,
    #[serde(default)]
    paid_by_method: PaymentMethod,
    #[serde(default)]
    attach_source: bool,
    ocr_provider: OcrProvider,
    #[serde(default)]
    raw_ocr_data: Option<OcrPayload>,
}

impl TryFrom<UncheckedVoucher> for VoucherRecord {
    type Error = String;

    fn try_from(v: UncheckedVoucher) -> Result<Self, Self::Error> {
        let manual = v.ocr_provider == OcrProvider::Manual;
        if manual != v.raw_ocr_data.is_none() {
            return Err(format!(
                "ocrProvider {:?} does not match rawOcrData presence",
                v.ocr_provider.as_str()
            ));
        }

        Ok(Self {
            id: v.id,
            source_image_url: v.source_image_url,
            source_file_name: v.source_file_name,
            voucher_no: v.voucher_no,
            date: v.date,
            amount: v.amount,
            pay_to: v.pay_to,
            rs_in_words: v.rs_in_words,
            being: v.being,
            and_debit: v.and_debit,
            authorised_by: v.authorised_by,
            paid_by_method: v.paid_by_method,
            attach_source: v.attach_source,
            ocr_provider: v.ocr_provider,
            raw_ocr_data: v.raw_ocr_data,
        })
    }
}
