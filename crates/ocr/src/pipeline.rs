use std::path::Path;

use kharcha_core::Transaction;
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::CompletionBackend;
use crate::parse::TransactionParser;
use crate::recognizer::{OcrBackend, OcrError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to extract text: {0}")]
    Ocr(#[from] OcrError),
}

/// The result of a single receipt processing run.
#[derive(Debug, Clone)]
pub struct ReceiptResult {
    /// Raw OCR text output.
    pub ocr_text: String,
    pub transaction: Transaction,
}

/// Orchestrates: OCR → parse. Nothing is stored.
pub struct ReceiptPipeline<R, C> {
    recognizer: R,
    parser: TransactionParser<C>,
}

impl<R: OcrBackend, C: CompletionBackend> ReceiptPipeline<R, C> {
    pub fn new(recognizer: R, parser: TransactionParser<C>) -> Self {
        Self { recognizer, parser }
    }

    pub fn parser(&self) -> &TransactionParser<C> {
        &self.parser
    }

    /// Process a file on disk.
    pub async fn process_file(&self, path: &Path) -> Result<ReceiptResult, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        self.process_bytes(&bytes).await
    }

    /// Process raw image bytes (upload or camera capture).
    pub async fn process_bytes(&self, data: &[u8]) -> Result<ReceiptResult, PipelineError> {
        let ocr_text = self.recognizer.recognize(data).inspect_err(|e| {
            warn!(error = %e, "OCR failed");
        })?;
        debug!(chars = ocr_text.len(), "OCR text extracted");

        let transaction = self.parser.parse_transaction(&ocr_text).await;
        Ok(ReceiptResult { ocr_text, transaction })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockCompletion;
    use crate::recognizer::MockRecognizer;
    use kharcha_core::{Category, ParseStatus};
    use std::time::Duration;

    fn offline_parser() -> TransactionParser<MockCompletion> {
        TransactionParser::new(None)
    }

    #[tokio::test]
    async fn process_bytes_produces_transaction() {
        let pipeline = ReceiptPipeline::new(
            MockRecognizer::new("Paid to Zomato ₹450 on 12/05/2023"),
            offline_parser(),
        );

        let result = pipeline.process_bytes(b"png bytes").await.unwrap();

        assert_eq!(result.ocr_text, "Paid to Zomato ₹450 on 12/05/2023");
        assert!(result.transaction.is_success());
        assert_eq!(result.transaction.category, Category::FoodAndDining);
    }

    #[tokio::test]
    async fn blank_ocr_text_is_error_transaction() {
        let pipeline = ReceiptPipeline::new(MockRecognizer::new(""), offline_parser());
        let result = pipeline.process_bytes(b"png bytes").await.unwrap();
        assert_eq!(result.transaction.status, ParseStatus::Error);
    }

    #[tokio::test]
    async fn ocr_failure_is_pipeline_error() {
        let pipeline = ReceiptPipeline::new(MockRecognizer::failing("no engine"), offline_parser());
        let err = pipeline.process_bytes(b"png bytes").await.unwrap_err();
        assert!(matches!(err, PipelineError::Ocr(_)));
        assert!(err.to_string().starts_with("Failed to extract text"));
    }

    #[tokio::test]
    async fn process_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.png");
        std::fs::write(&path, b"fake").unwrap();

        let pipeline = ReceiptPipeline::new(
            MockRecognizer::new("Sent to Ola Cabs 320"),
            TransactionParser::with_backend(
                MockCompletion::failing("offline"),
                Duration::from_secs(1),
            ),
        );
        let result = pipeline.process_file(&path).await.unwrap();
        assert_eq!(result.transaction.merchant, "Ola Cabs");
        assert_eq!(result.transaction.category, Category::Transport);

        let missing = pipeline.process_file(&dir.path().join("nope.png")).await;
        assert!(matches!(missing, Err(PipelineError::Io(_))));
    }
}
