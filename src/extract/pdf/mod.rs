//! PDF extraction.
//!
//! Two tiers:
//! - semantic conversion through the first available [`SemanticConverter`]
//!   that can honour the request
//! - raw per-page text via lopdf, headed `## Page N`, which always succeeds
//!   for a readable document

mod raw;
mod semantic;

pub use raw::{check_page, render_pages, LopdfSource, PageSource, EMPTY_PAGE_PLACEHOLDER};
pub use semantic::{
    default_converters, CallShape, CommandConverter, ConverterConfig, ConverterRegistry,
    SemanticConverter,
};

use std::path::Path;

use tracing::info;

use super::ExtractionError;

/// Two-tier PDF extractor.
#[derive(Clone, Default)]
pub struct PdfExtractor {
    registry: ConverterRegistry,
}

impl PdfExtractor {
    pub fn new(registry: ConverterRegistry) -> Self {
        Self { registry }
    }

    /// Extractor using only the raw fallback.
    pub fn raw_only() -> Self {
        Self::new(ConverterRegistry::empty())
    }

    pub fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }

    /// Number of pages in the document.
    pub fn page_count(&self, path: &Path) -> Result<u32, ExtractionError> {
        Ok(LopdfSource::open(path)?.page_count())
    }

    /// Markdown for the whole document or a single 1-based page.
    ///
    /// A page selector is bounds-checked before any converter runs, so an
    /// out-of-range page fails the same way regardless of which tier would
    /// have answered.
    pub fn extract(&self, path: &Path, page: Option<u32>) -> Result<String, ExtractionError> {
        let opened = match page {
            Some(n) => {
                let source = LopdfSource::open(path)?;
                check_page(n, source.page_count())?;
                Some(source)
            }
            None => None,
        };

        if let Some(markdown) = self.registry.convert(path, page) {
            return Ok(markdown);
        }

        info!("falling back to raw page text for {}", path.display());
        let source = match opened {
            Some(source) => source,
            None => LopdfSource::open(path)?,
        };
        render_pages(&source, page)
    }
}
