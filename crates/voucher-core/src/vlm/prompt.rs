//! Instruction sent with every receipt image.

/// Asks the model for one JSON object describing a payment receipt.
pub const OCR_PROMPT: &str = r#"You are an expert document reader. Analyze this payment receipt or screenshot and extract ALL information with 100% accuracy.

RULES:
- Transcribe EXACTLY what you see. Do not guess, infer, or approximate.
- Preserve the original script (Arabic, Devanagari, English, numbers, symbols) exactly as shown.
- Mark any uncertain character with [?].
- Capture EVERYTHING: headers, footers, timestamps, reference numbers, status text, logo text.

Return your response as valid JSON with this structure:
{
  "company": "Company or app name shown on the receipt",
  "receipt_type": "Transfer / Payment / Top-up / etc.",
  "status": "Successful / Completed / Pending / etc.",
  "date": "Date as shown on the receipt",
  "time": "Time as shown on the receipt (if visible)",
  "amount": "Total amount with currency",
  "currency": "Currency code or symbol",
  "reference_number": "Transaction or reference number",
  "from_account": "Sender account or name if shown",
  "to_account": "Recipient account or name if shown",
  "line_items": [
    {"label": "Fee", "value": "0.00"},
    {"label": "description label", "value": "value"}
  ],
  "additional_fields": {
    "any_other_field_name": "its value"
  },
  "full_text_transcription": "Complete verbatim transcription of ALL text visible in the image, preserving layout with newlines"
}

Important:
- Include ALL visible fields, even small footer text or watermarks.
- line_items must capture every labeled value pair on the receipt.
- additional_fields must capture anything not covered by the standard fields above.
- full_text_transcription must contain EVERY piece of text in the image, top to bottom."#;
