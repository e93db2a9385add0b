use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::amount::Amount;
use super::category::Category;

/// Merchant name used when no signal could be found in the receipt text.
pub const UNKNOWN_MERCHANT: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    Success,
    Error,
}

impl std::fmt::Display for ParseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseStatus::Success => write!(f, "success"),
            ParseStatus::Error => write!(f, "error"),
        }
    }
}

/// The normalized record produced from one receipt's text.
///
/// When `status` is [`ParseStatus::Error`] the remaining fields hold their
/// defaults and must not be persisted; `error` carries the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub amount: Option<Amount>,
    pub merchant: String,
    pub category: Category,
    /// Date token exactly as it appeared in the text (not normalized).
    pub date: Option<String>,
    pub status: ParseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Transaction {
    pub fn success(
        amount: Option<Amount>,
        merchant: impl Into<String>,
        category: Category,
        date: Option<String>,
    ) -> Self {
        Transaction {
            amount,
            merchant: merchant.into(),
            category,
            date,
            status: ParseStatus::Success,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Transaction {
            amount: None,
            merchant: UNKNOWN_MERCHANT.to_string(),
            category: Category::Other,
            date: None,
            status: ParseStatus::Error,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ParseStatus::Success
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Interpret the verbatim date token day-first (`DD/MM/YYYY`, `DD-MM-YY`).
    /// Two-digit years are taken as 20xx. Returns `None` for tokens that are
    /// not a real calendar date.
    pub fn date_as_naive(&self) -> Option<NaiveDate> {
        let token = self.date.as_deref()?;
        let mut parts = token.split(['/', '-']);
        let day: u32 = parts.next()?.parse().ok()?;
        let month: u32 = parts.next()?.parse().ok()?;
        let year: i32 = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        NaiveDate::from_ymd_opt(expand_year(year), month, day)
    }
}

fn expand_year(y: i32) -> i32 {
    if y < 100 { 2000 + y } else { y }
}
