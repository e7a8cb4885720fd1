//! Text Extractor: PDF bytes to plain text.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::resumes::store::PDF_MAGIC;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("document is not a PDF")]
    NotPdf,

    #[error("failed to extract text from PDF: {0}")]
    Unreadable(String),
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, pdf: Bytes) -> Result<String, ExtractError>;
}

/// `pdf-extract` backed extractor. Parsing is CPU-bound, so it runs on the
/// blocking pool; a panic inside the parser is reported as an unreadable PDF.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, pdf: Bytes) -> Result<String, ExtractError> {
        if !pdf.starts_with(PDF_MAGIC) {
            return Err(ExtractError::NotPdf);
        }

        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&pdf))
            .await
            .map_err(|e| ExtractError::Unreadable(format!("PDF parser aborted: {e}")))?
            .map_err(|e| ExtractError::Unreadable(e.to_string()))
    }
}
