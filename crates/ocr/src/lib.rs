//! Receipt-text-to-transaction extraction.
//!
//! [`TransactionParser`] is the entry point: it asks a completion service
//! for a structured reading of the text when one is configured, and falls
//! back to the ordered regex extractors in [`extract`] and [`merchant`].

pub mod ai;
pub mod config;
pub mod extract;
pub mod llm;
pub mod merchant;
pub mod parse;
pub mod pattern;
pub mod pipeline;
pub mod recognizer;
pub mod types;

pub use ai::{build_prompt, parse_reply, AiParser};
pub use config::{AiConfig, ConfigError, EngineConfig};
pub use extract::{extract_amount, extract_date};
pub use llm::{AiError, ChatTurn, CompletionBackend, Conversation, GroqClient, MockCompletion, Role};
pub use merchant::{categorize, extract_merchant_info};
pub use parse::{parse_offline, TransactionParser, EMPTY_TEXT_ERROR};
pub use pattern::{ExtractError, ExtractionPattern};
pub use pipeline::{PipelineError, ReceiptPipeline, ReceiptResult};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError};
pub use types::{AiExtraction, MerchantInfo};
