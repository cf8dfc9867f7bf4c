//! Voucher output formats.

use voucher_core::VoucherRecord;

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON array of vouchers
    Json,
    /// One CSV row per voucher
    Csv,
    /// Plain text voucher blocks
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub fn format_vouchers(vouchers: &[VoucherRecord], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(vouchers)?),
        OutputFormat::Csv => format_csv(vouchers),
        OutputFormat::Text => Ok(format_text(vouchers)),
    }
}

fn format_csv(vouchers: &[VoucherRecord]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "voucherNo",
        "date",
        "amount",
        "payTo",
        "rsInWords",
        "being",
        "andDebit",
        "authorisedBy",
        "paidByMethod",
        "ocrProvider",
        "sourceFileName",
    ])?;

    for v in vouchers {
        wtr.write_record([
            v.voucher_no.as_str(),
            v.date.as_str(),
            v.amount.as_str(),
            v.pay_to.as_str(),
            v.rs_in_words.as_str(),
            v.being.as_str(),
            v.and_debit.as_str(),
            v.authorised_by.as_str(),
            v.paid_by_method.as_str(),
            v.ocr_provider().as_str(),
            v.source_file_name.as_str(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(vouchers: &[VoucherRecord]) -> String {
    let mut output = String::new();

    for (i, v) in vouchers.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        output.push_str(&format!("Cash Voucher {}\n", or_dash(&v.voucher_no)));
        output.push_str(&format!("  Source:        {}\n", or_dash(&v.source_file_name)));
        output.push_str(&format!("  Date:          {}\n", or_dash(&v.date)));
        output.push_str(&format!("  Pay to:        {}\n", or_dash(&v.pay_to)));
        output.push_str(&format!("  Amount:        {}\n", or_dash(&v.amount)));
        output.push_str(&format!("  Rs. in words:  {}\n", or_dash(&v.rs_in_words)));
        output.push_str(&format!("  Being:         {}\n", or_dash(&v.being)));
        output.push_str(&format!("  And debit:     {}\n", or_dash(&v.and_debit)));
        output.push_str(&format!("  Authorised by: {}\n", or_dash(&v.authorised_by)));
        output.push_str(&format!("  Paid by:       {}\n", v.paid_by_method.as_str()));
        output.push_str(&format!("  Read by:       {}\n", v.ocr_provider().as_str()));
    }

    output
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}
