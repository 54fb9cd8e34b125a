//! Text extraction strategies, tried in order by the extractor.

use std::panic::{AssertUnwindSafe, catch_unwind};

use thiserror::Error;

/// Why a single strategy could not produce text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The strategy does not handle this kind of document.
    #[error("{strategy}: not applicable to this document")]
    NotApplicable { strategy: &'static str },

    /// The underlying library rejected the document.
    #[error("{strategy}: {message}")]
    Failed {
        strategy: &'static str,
        message: String,
    },

    /// The underlying library panicked on malformed input.
    #[error("{strategy}: extractor panicked")]
    Panicked { strategy: &'static str },
}

/// One way of turning document bytes into text.
pub trait ExtractionStrategy: Send + Sync + std::fmt::Debug {
    /// Short stable name, used in logs and batch status.
    fn name(&self) -> &'static str;

    /// Extracts text from the raw document bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] when the document cannot be handled.
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Runs `op`, converting a panic inside a third-party parser into an error.
fn guarded<F>(strategy: &'static str, op: F) -> Result<String, ExtractionError>
where
    F: FnOnce() -> Result<String, ExtractionError>,
{
    catch_unwind(AssertUnwindSafe(op)).unwrap_or(Err(ExtractionError::Panicked { strategy }))
}

/// Primary PDF text extraction via `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractStrategy;

impl ExtractionStrategy for PdfExtractStrategy {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let strategy = self.name();
        guarded(strategy, || {
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractionError::Failed {
                strategy,
                message: e.to_string(),
            })
        })
    }
}

/// Fallback PDF extraction reading page content streams with `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfStrategy;

impl ExtractionStrategy for LopdfStrategy {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let strategy = self.name();
        let failed = |e: lopdf::Error| ExtractionError::Failed {
            strategy,
            message: e.to_string(),
        };
        guarded(strategy, || {
            let doc = lopdf::Document::load_mem(bytes).map_err(failed)?;
            let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
            doc.extract_text(&pages).map_err(failed)
        })
    }
}

/// Accepts documents that are already UTF-8 text rather than PDFs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextStrategy;

/// Magic bytes at the start of every PDF file.
const PDF_MAGIC: &[u8] = b"%PDF";

impl ExtractionStrategy for PlainTextStrategy {
    fn name(&self) -> &'static str {
        "plain-text"
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        if bytes.starts_with(PDF_MAGIC) {
            return Err(ExtractionError::NotApplicable {
                strategy: self.name(),
            });
        }
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| ExtractionError::Failed {
                strategy: self.name(),
                message: e.to_string(),
            })
    }
}
