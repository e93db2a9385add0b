use kharcha_core::{Category, UNKNOWN_MERCHANT};
use tracing::debug;

use crate::pattern::{re, ExtractError, ExtractionPattern};
use crate::types::MerchantInfo;

/// Merchant-name patterns, tried in order against the filtered text.
pub static MERCHANT_PATTERNS: [ExtractionPattern; 3] = [
    ExtractionPattern::new(
        r"(?i)(?:paid to|sent to|for|merchant|recipient|shop|requested by)[\s:]+([a-z][a-z\s&\.-]+?)(?:\s*\d|\s+on\s+behalf|\s+on\s+\d|\n|$|\s+\*|\s+@)",
        "Payee label",
    ),
    ExtractionPattern::new(
        r"(?i)received\s+(?:from|by)[\s:]+([a-z][a-z\s&\.-]+?)(?:\s*\d|\s+on\s+behalf|\s+on\s+\d|\n|$|\s+\*|\s+@)",
        "Received from/by",
    ),
    ExtractionPattern::new(
        r"(?i)to\s+([a-z][a-z\s&\.-]+?)(?:\s*\d|\s+on\s+behalf|\s+on\s+\d|\n|$|\s+\*|\s+@)",
        "Bare 'to'",
    ),
];

re!(re_time_of_day, "Time of day", r"\d{2}:\d{2}");

/// Lines mentioning any of these are transaction metadata, not payees.
const METADATA_KEYWORDS: &[&str] = &["upi", "ref", "txn", "id", "bank", "transaction"];

/// Well-known merchants, searched in this order when no pattern matched.
const KNOWN_MERCHANTS: &[(&str, &str)] = &[
    ("spotify", "Spotify"),
    ("billdesk", "BillDesk"),
    ("zomato", "Zomato"),
    ("swiggy", "Swiggy"),
    ("amazon", "Amazon"),
    ("flipkart", "Flipkart"),
    ("bigbasket", "BigBasket"),
    ("uber", "Uber"),
    ("ola", "Ola"),
    ("irctc", "IRCTC"),
    ("bookmyshow", "BookMyShow"),
];

/// Keyword groups for categorization, tested in this order.
const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (Category::Entertainment, &["spotify", "netflix", "prime", "hotstar"]),
    (
        Category::FoodAndDining,
        &["zomato", "swiggy", "food", "restaurant", "cafe", "dining"],
    ),
    (Category::Shopping, &["amazon", "flipkart", "myntra", "ajio"]),
    (Category::Transport, &["uber", "ola", "rapido"]),
    (
        Category::BillsAndUtilities,
        &["billdesk", "phonepe", "paytm", "google pay"],
    ),
];

/// Resolve the payee and its category from receipt text.
pub fn extract_merchant_info(text: &str) -> Result<MerchantInfo, ExtractError> {
    let filtered = strip_metadata_lines(text)?;

    let merchant = match match_merchant_pattern(&filtered)? {
        Some(name) => name,
        None => match known_merchant(text) {
            Some(name) => {
                debug!(merchant = name, "merchant from dictionary");
                name.to_string()
            }
            None => UNKNOWN_MERCHANT.to_string(),
        },
    };

    let category = categorize(&merchant);
    Ok(MerchantInfo { merchant, category })
}

/// Map a resolved merchant name to a category. Only the name is inspected.
pub fn categorize(merchant: &str) -> Category {
    let lower = merchant.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or_default()
}

fn strip_metadata_lines(text: &str) -> Result<String, ExtractError> {
    let time = re_time_of_day()?;
    let kept: Vec<&str> = text
        .split('\n')
        .filter(|line| {
            let lower = line.to_lowercase();
            !METADATA_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .filter(|line| !time.is_match(line))
        .collect();
    Ok(kept.join("\n"))
}

fn match_merchant_pattern(text: &str) -> Result<Option<String>, ExtractError> {
    for pattern in &MERCHANT_PATTERNS {
        let Some(raw) = pattern
            .regex()?
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
        else {
            continue;
        };

        let name = clean_merchant_name(raw);
        if name.chars().count() >= 2 {
            debug!(pattern = pattern.label, merchant = %name, "merchant matched");
            return Ok(Some(name));
        }
        debug!(pattern = pattern.label, raw, "merchant candidate too short");
    }
    Ok(None)
}

fn known_merchant(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    KNOWN_MERCHANTS
        .iter()
        .find(|(key, _)| lower.contains(key))
        .map(|(_, name)| *name)
}

/// Blank out stray symbols, then title-case each word.
fn clean_merchant_name(raw: &str) -> String {
    let blanked: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() || matches!(c, '&' | '.' | '-') {
                c
            } else {
                ' '
            }
        })
        .collect();
    blanked
        .split_whitespace()
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
