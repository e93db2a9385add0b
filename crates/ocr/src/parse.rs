use std::time::Duration;

use kharcha_core::Transaction;
use tracing::{debug, warn};

use crate::ai::AiParser;
use crate::config::EngineConfig;
use crate::extract::{extract_amount, extract_date};
use crate::llm::{CompletionBackend, Conversation, GroqClient};
use crate::merchant::{categorize, extract_merchant_info};
use crate::pattern::ExtractError;
use crate::types::AiExtraction;

pub const EMPTY_TEXT_ERROR: &str = "no text content to analyze";

/// Public entry point: receipt text in, [`Transaction`] out.
///
/// Tries the AI tier when one is configured and falls back to the regex
/// extractors otherwise. Never panics and never returns an AI failure to
/// the caller; `status = error` is reserved for blank input and internal
/// pattern faults.
pub struct TransactionParser<C> {
    ai: Option<AiParser<C>>,
}

impl TransactionParser<GroqClient> {
    /// Build from configuration. A missing or unusable credential leaves
    /// the parser in regex-only mode.
    pub fn from_config(config: &EngineConfig) -> Self {
        if !config.ai.has_credential() {
            debug!("no AI credential configured, regex extraction only");
            return Self::new(None);
        }
        match GroqClient::new(config.ai.clone()) {
            Ok(client) => Self::new(Some(AiParser::new(client, config.ai.timeout()))),
            Err(e) => {
                warn!(error = %e, "could not create completion client, regex extraction only");
                Self::new(None)
            }
        }
    }
}

impl<C: CompletionBackend> TransactionParser<C> {
    pub fn new(ai: Option<AiParser<C>>) -> Self {
        Self { ai }
    }

    pub fn with_backend(backend: C, timeout: Duration) -> Self {
        Self::new(Some(AiParser::new(backend, timeout)))
    }

    pub fn has_ai(&self) -> bool {
        self.ai.is_some()
    }

    pub fn ai(&self) -> Option<&AiParser<C>> {
        self.ai.as_ref()
    }

    pub async fn parse_transaction(&self, text: &str) -> Transaction {
        let mut conversation = Conversation::new();
        self.parse_transaction_with(text, &mut conversation).await
    }

    /// Like [`parse_transaction`](Self::parse_transaction), but the AI
    /// exchange is appended to a conversation the caller owns.
    pub async fn parse_transaction_with(
        &self,
        text: &str,
        conversation: &mut Conversation,
    ) -> Transaction {
        if text.trim().is_empty() {
            warn!("empty text provided for parsing");
            return Transaction::error(EMPTY_TEXT_ERROR);
        }

        if let Some(ai) = &self.ai {
            match ai.parse(text, conversation).await {
                Ok(extraction) if extraction.is_usable() => {
                    debug!("using AI extraction");
                    return finish(merge_with_regex(extraction, text));
                }
                Ok(_) => debug!("AI reply named neither amount nor merchant, falling back"),
                Err(e) => warn!(error = %e, "AI extraction failed, falling back"),
            }
        }

        finish(regex_transaction(text))
    }
}

/// Regex-only parse. Same contract as the async entry point, no runtime needed.
pub fn parse_offline(text: &str) -> Transaction {
    if text.trim().is_empty() {
        warn!("empty text provided for parsing");
        return Transaction::error(EMPTY_TEXT_ERROR);
    }
    finish(regex_transaction(text))
}

fn regex_transaction(text: &str) -> Result<Transaction, ExtractError> {
    let amount = extract_amount(text)?;
    let info = extract_merchant_info(text)?;
    let date = extract_date(text)?;
    Ok(Transaction::success(amount, info.merchant, info.category, date))
}

/// AI fields win; gaps are filled from the regex extractors. A missing
/// category is derived from whichever merchant was resolved.
fn merge_with_regex(ai: AiExtraction, text: &str) -> Result<Transaction, ExtractError> {
    let amount = match ai.amount {
        Some(a) => Some(a),
        None => extract_amount(text)?,
    };
    let merchant = match ai.merchant {
        Some(m) => m,
        None => extract_merchant_info(text)?.merchant,
    };
    let category = ai.category.unwrap_or_else(|| categorize(&merchant));
    let date = match ai.date {
        Some(d) => Some(d),
        None => extract_date(text)?,
    };
    Ok(Transaction::success(amount, merchant, category, date))
}

fn finish(result: Result<Transaction, ExtractError>) -> Transaction {
    match result {
        Ok(tx) => {
            debug!(?tx, "transaction parsed");
            tx
        }
        Err(e) => {
            warn!(error = %e, "internal fault while parsing transaction");
            Transaction::error(format!("Error parsing transaction: {e}"))
        }
    }
}
