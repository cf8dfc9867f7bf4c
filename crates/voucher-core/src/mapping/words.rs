//! Rupee amounts in words, using Indian grouping (crore, lakh, thousand).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

const ONES: [&str; 20] = [
    "",
    "One",
    "Two",
    "Three",
    "Four",
    "Five",
    "Six",
    "Seven",
    "Eight",
    "Nine",
    "Ten",
    "Eleven",
    "Twelve",
    "Thirteen",
    "Fourteen",
    "Fifteen",
    "Sixteen",
    "Seventeen",
    "Eighteen",
    "Nineteen",
];

const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

const CRORE: u64 = 10_000_000;
const LAKH: u64 = 100_000;
const THOUSAND: u64 = 1_000;

/// Parse the numeric part of a free-form amount string.
///
/// Everything except digits and `.` is dropped; a second `.` ends the number.
pub fn parse_amount(amount: &str) -> Option<Decimal> {
    let mut cleaned = String::with_capacity(amount.len());
    let mut seen_dot = false;
    for c in amount.chars() {
        match c {
            '0'..='9' => cleaned.push(c),
            '.' if !seen_dot => {
                seen_dot = true;
                cleaned.push(c);
            }
            '.' => break,
            _ => {}
        }
    }

    let cleaned = cleaned.trim_end_matches('.');
    if cleaned.is_empty() {
        return None;
    }
    if cleaned.starts_with('.') {
        return format!("0{}", cleaned).parse().ok();
    }
    cleaned.parse().ok()
}

/// Amount string to words. Anything without a number reads as "Zero".
pub fn amount_to_words(amount: &str) -> String {
    parse_amount(amount)
        .map(to_words)
        .unwrap_or_else(|| "Zero".to_string())
}

/// `1500.50` becomes "One Thousand Five Hundred Rupees and Fifty Paise Only".
pub fn to_words(amount: Decimal) -> String {
    let amount = amount.abs();
    let mut whole = amount.trunc().to_u64().unwrap_or(u64::MAX);
    let mut paise = (amount.fract() * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .unwrap_or(0);

    if paise >= 100 {
        whole = whole.saturating_add(1);
        paise -= 100;
    }

    if whole == 0 && paise == 0 {
        return "Zero".to_string();
    }

    let mut parts = Vec::new();
    if whole > 0 {
        parts.push(indian_words(whole));
        parts.push("Rupees".to_string());
    }
    if paise > 0 {
        parts.push("and".to_string());
        parts.push(two_digits(paise));
        parts.push("Paise".to_string());
    }
    parts.push("Only".to_string());

    parts.join(" ")
}

fn indian_words(n: u64) -> String {
    let crore = n / CRORE;
    let lakh = (n % CRORE) / LAKH;
    let thousand = (n % LAKH) / THOUSAND;
    let rest = n % THOUSAND;

    let mut parts = Vec::new();
    if crore > 0 {
        // Above 99 crore the count itself uses lakh/thousand grouping.
        let count = if crore >= 100 {
            indian_words(crore)
        } else {
            two_digits(crore)
        };
        parts.push(format!("{} Crore", count));
    }
    if lakh > 0 {
        parts.push(format!("{} Lakh", two_digits(lakh)));
    }
    if thousand > 0 {
        parts.push(format!("{} Thousand", two_digits(thousand)));
    }
    if rest > 0 {
        parts.push(three_digits(rest));
    }

    parts.join(" ")
}

fn two_digits(n: u64) -> String {
    let n = n as usize;
    if n < 20 {
        ONES[n].to_string()
    } else if n % 10 == 0 {
        TENS[n / 10].to_string()
    } else {
        format!("{} {}", TENS[n / 10], ONES[n % 10])
    }
}

fn three_digits(n: u64) -> String {
    let hundreds = n / 100;
    let rest = n % 100;

    match (hundreds, rest) {
        (0, _) => two_digits(rest),
        (h, 0) => format!("{} Hundred", ONES[h as usize]),
        (h, r) => format!("{} Hundred {}", ONES[h as usize], two_digits(r)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn test_zero() {
        assert_eq!(to_words(Decimal::ZERO), "Zero");
        assert_eq!(amount_to_words("0.00"), "Zero");
        assert_eq!(amount_to_words(""), "Zero");
        assert_eq!(amount_to_words("N/A"), "Zero");
    }

    #[test]
    fn test_one_lakh() {
        assert_eq!(amount_to_words("100000"), "One Lakh Rupees Only");
    }

    #[test]
    fn test_rupees_and_paise() {
        assert_eq!(
            amount_to_words("1500.50"),
            "One Thousand Five Hundred Rupees and Fifty Paise Only"
        );
    }

    #[test]
    fn test_full_grouping() {
        assert_eq!(
            amount_to_words("123456"),
            "One Lakh Twenty Three Thousand Four Hundred Fifty Six Rupees Only"
        );
        assert_eq!(
            amount_to_words("₹ 2,50,00,017"),
            "Two Crore Fifty Lakh Seventeen Rupees Only"
        );
    }

    #[test]
    fn test_large_crore_counts_recurse() {
        assert_eq!(
            to_words(Decimal::from(1_234_00_00_000u64)),
            "One Thousand Two Hundred Thirty Four Crore Rupees Only"
        );
    }

    #[test]
    fn test_paise_only() {
        assert_eq!(amount_to_words(".75"), "and Seventy Five Paise Only");
    }

    #[test]
    fn test_paise_rounding_carries() {
        assert_eq!(
            to_words(Decimal::from_str("1234.995").unwrap()),
            "One Thousand Two Hundred Thirty Five Rupees Only"
        );
        assert_eq!(
            to_words(Decimal::from_str("10.005").unwrap()),
            "Ten Rupees and One Paise Only"
        );
    }

    #[test]
    fn test_negative_uses_magnitude() {
        assert_eq!(to_words(Decimal::from(-20)), "Twenty Rupees Only");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("₹ 1,234.50"), Some(Decimal::from_str("1234.50").unwrap()));
        assert_eq!(parse_amount("1.2.3"), Some(Decimal::from_str("1.2").unwrap()));
        assert_eq!(parse_amount("12."), Some(Decimal::from(12)));
        assert_eq!(parse_amount("paid"), None);
    }
}
