use kharcha_core::{Amount, Category};
use serde::{Deserialize, Serialize};

/// Resolved payee plus the category derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantInfo {
    pub merchant: String,
    pub category: Category,
}

/// Fields recovered from a language-model reply after validation.
///
/// Every field is optional; values that failed validation are absent rather
/// than carried through as raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiExtraction {
    pub amount: Option<Amount>,
    pub merchant: Option<String>,
    pub category: Option<Category>,
    pub date: Option<String>,
}

impl AiExtraction {
    /// Worth adopting only if it names an amount or a merchant.
    pub fn is_usable(&self) -> bool {
        self.amount.is_some() || self.merchant.is_some()
    }
}
