use std::str::FromStr;

use kharcha_core::Amount;
use rust_decimal::Decimal;
use tracing::debug;

use crate::pattern::{re, ExtractError, ExtractionPattern};

/// Amount patterns, most trustworthy first.
pub static AMOUNT_PATTERNS: [ExtractionPattern; 5] = [
    // ₹20,000 or ₹ 20,000.50
    ExtractionPattern::new(r"₹\s*([\d,]+(?:\.\d{1,2})?)", "Rupee symbol with comma"),
    // INR 20,000 or INR20,000
    ExtractionPattern::new(r"INR\s*([\d,]+(?:\.\d{1,2})?)", "INR with comma"),
    // Amount: ₹20,000 or Amount 20000
    ExtractionPattern::new(r"Amount\s*[:\-]?\s*₹?\s*([\d,]+)", "Amount label"),
    ExtractionPattern::new(r"(\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?)", "Comma separated number"),
    ExtractionPattern::new(r"\b(\d{4,6})\b", "4-6 digit number"),
];

re!(re_date, "Date token", r"(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})");

/// Scan `text` for the first plausible amount.
///
/// Each pattern contributes at most its first match. A match that does not
/// parse, or parses outside the plausible range, hands over to the next
/// pattern rather than ending the search.
pub fn extract_amount(text: &str) -> Result<Option<Amount>, ExtractError> {
    for pattern in &AMOUNT_PATTERNS {
        let Some(raw) = pattern
            .regex()?
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
        else {
            continue;
        };

        let Some(value) = parse_amount_str(raw) else {
            debug!(pattern = pattern.label, raw, "unparseable amount match");
            continue;
        };

        match Amount::plausible(value) {
            Some(amount) => {
                debug!(pattern = pattern.label, %amount, "amount found");
                return Ok(Some(amount));
            }
            None => debug!(pattern = pattern.label, %value, "amount outside plausible range"),
        }
    }
    Ok(None)
}

/// First `D/M/Y`-shaped token in text order, returned verbatim.
pub fn extract_date(text: &str) -> Result<Option<String>, ExtractError> {
    Ok(re_date()?
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string()))
}

// ── Amount parsing ────────────────────────────────────────────────────────────

/// Code points of `0` in the non-ASCII decimal digit blocks receipts use.
/// `\d` matches these, so they are folded to ASCII before parsing.
const DIGIT_ZEROS: [u32; 12] = [
    0x0660, // Arabic-Indic
    0x06F0, // Extended Arabic-Indic
    0x0966, // Devanagari
    0x09E6, // Bengali
    0x0A66, // Gurmukhi
    0x0AE6, // Gujarati
    0x0B66, // Oriya
    0x0BE6, // Tamil
    0x0C66, // Telugu
    0x0CE6, // Kannada
    0x0D66, // Malayalam
    0xFF10, // Fullwidth
];

fn fold_digit(c: char) -> char {
    let cp = c as u32;
    DIGIT_ZEROS
        .iter()
        .find(|&&zero| (zero..zero + 10).contains(&cp))
        .and_then(|&zero| char::from_digit(cp - zero, 10))
        .unwrap_or(c)
}

/// Strip thousands separators and parse as a decimal.
pub(crate) fn parse_amount_str(s: &str) -> Option<Decimal> {
    let clean: String = s.chars().filter(|&c| c != ',').map(fold_digit).collect();
    Decimal::from_str(&clean).ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
