//! Plain-text extraction from fetched documents.
//!
//! The [`ContentExtractor`] tries an ordered list of [`ExtractionStrategy`]
//! implementations; the first success wins. When every strategy fails, or
//! the artifact cannot be read at all, it returns [`PLACEHOLDER_TEXT`]
//! instead of an error so the item can still be scored.
//!
//! The default chain only understands PDF. A non-PDF body such as an HTML
//! error page degrades to the placeholder. [`PlainTextStrategy`] can be
//! appended through [`ContentExtractor::with_strategies`] by callers that
//! want UTF-8 bodies scored as-is.

mod strategies;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

pub use strategies::{
    ExtractionError, ExtractionStrategy, LopdfStrategy, PdfExtractStrategy, PlainTextStrategy,
};

/// Text returned when no strategy could extract anything.
pub const PLACEHOLDER_TEXT: &str = "Could not extract text from PDF";

/// Result of an extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    /// Name of the strategy that succeeded, `None` when degraded to the placeholder.
    pub strategy: Option<&'static str>,
}

impl ExtractedText {
    fn placeholder() -> Self {
        Self {
            text: PLACEHOLDER_TEXT.to_string(),
            strategy: None,
        }
    }

    /// True when the text is the placeholder rather than document content.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.strategy.is_none()
    }
}

/// Ordered chain of extraction strategies.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    strategies: Arc<[Box<dyn ExtractionStrategy>]>,
}

impl Default for ContentExtractor {
    /// `pdf-extract`, then `lopdf`.
    fn default() -> Self {
        Self::with_strategies(vec![Box::new(PdfExtractStrategy), Box::new(LopdfStrategy)])
    }
}

impl ContentExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self {
            strategies: strategies.into(),
        }
    }

    /// Strategy names in the order they are tried.
    #[must_use]
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Runs the strategy chain over in-memory bytes.
    #[must_use]
    pub fn extract_bytes(&self, bytes: &[u8]) -> ExtractedText {
        for strategy in self.strategies.iter() {
            match strategy.extract(bytes) {
                Ok(text) => {
                    debug!(
                        strategy = strategy.name(),
                        chars = text.len(),
                        "extraction succeeded"
                    );
                    return ExtractedText {
                        text,
                        strategy: Some(strategy.name()),
                    };
                }
                Err(e) => debug!(error = %e, "extraction strategy failed"),
            }
        }

        warn!("all extraction strategies failed, using placeholder text");
        ExtractedText::placeholder()
    }

    /// Reads the artifact at `path` and extracts its text on the blocking pool.
    ///
    /// Never fails: unreadable files and exhausted strategies both yield the
    /// placeholder.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn extract_text(&self, path: &Path) -> ExtractedText {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "could not read artifact, using placeholder text");
                return ExtractedText::placeholder();
            }
        };

        let extractor = self.clone();
        match tokio::task::spawn_blocking(move || extractor.extract_bytes(&bytes)).await {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!(error = %e, "extraction task failed, using placeholder text");
                ExtractedText::placeholder()
            }
        }
    }
}
