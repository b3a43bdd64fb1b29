//! Text preview extraction from PDF payloads.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Text budget per page when the backend output carries no page breaks.
const PREVIEW_CHARS_PER_PAGE: usize = 3000;

/// Errors from a text extraction backend.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The backend could not parse the document.
    #[error("PDF text extraction failed: {message}")]
    Malformed {
        /// Backend error description.
        message: String,
    },

    /// The backend panicked or its worker was cancelled.
    #[error("PDF text extraction aborted: {message}")]
    Aborted {
        /// Join error description.
        message: String,
    },
}

impl ExtractError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::Aborted {
            message: message.into(),
        }
    }
}

/// Capability: text of the first `page_limit` pages of a document.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Returns the concatenated text of up to `page_limit` pages.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the document cannot be read.
    async fn extract_text(&self, payload: &[u8], page_limit: usize) -> Result<String, ExtractError>;
}

/// [`TextExtractor`] backed by `pdf-extract`, run on the blocking pool.
///
/// `pdf-extract` panics on some malformed inputs; those surface as
/// [`ExtractError::Aborted`] instead of unwinding into the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract_text(&self, payload: &[u8], page_limit: usize) -> Result<String, ExtractError> {
        let owned = payload.to_vec();
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&owned))
            .await
            .map_err(|e| ExtractError::aborted(e.to_string()))?
            .map_err(|e| ExtractError::malformed(e.to_string()))?;

        let preview = leading_pages(&text, page_limit);
        debug!(chars = preview.len(), page_limit, "extracted PDF text preview");
        Ok(preview)
    }
}

/// Keeps the first `page_limit` pages of extracted text.
///
/// Pages are split on form feeds; output without them is cut to a per-page
/// character budget instead.
fn leading_pages(text: &str, page_limit: usize) -> String {
    if text.contains('\u{c}') {
        return text
            .split('\u{c}')
            .take(page_limit)
            .collect::<Vec<_>>()
            .join("\n");
    }
    text.chars()
        .take(page_limit.saturating_mul(PREVIEW_CHARS_PER_PAGE))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pdf_extractor_rejects_non_pdf() {
        let result = PdfTextExtractor
            .extract_text(b"<html>definitely not a pdf</html>", 3)
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_leading_pages_splits_on_form_feed() {
        let text = "one\u{c}two\u{c}three\u{c}four";
        assert_eq!(leading_pages(text, 2), "one\ntwo");
    }

    #[test]
    fn test_leading_pages_budget_without_breaks() {
        let text = "x".repeat(PREVIEW_CHARS_PER_PAGE * 5);
        assert_eq!(leading_pages(&text, 2).len(), PREVIEW_CHARS_PER_PAGE * 2);
        assert_eq!(leading_pages("short", 3), "short");
    }

    #[test]
    fn test_extract_error_display() {
        let error = ExtractError::malformed("bad xref");
        assert!(error.to_string().contains("bad xref"));
    }
}
