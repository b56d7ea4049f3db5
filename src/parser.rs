//! Extraction orchestration.
//!
//! [`DocumentParser`] is the single entry point used by the CLI and the HTTP
//! server: it classifies a document, runs the matching extractor, enforces the
//! input ceiling and, when asked, hands the result to a refinement provider.

use std::fs;

use thiserror::Error;
use tracing::{debug, info};

use crate::extract::{
    binary_fallback, classify_document, csv_to_markdown, decode_lossy, extract_docx,
    extract_pptx, extract_xlsx, html_to_text, list_sheets, list_slides, ExtractionError,
    PdfExtractor, Strategy,
};
use crate::llm::{LlmClient, LlmConfig, LlmError, LlmOverrides};
use crate::models::{AppliedSelector, DocumentReference, ExtractionOutcome, ExtractionSelector};

/// Errors surfaced by [`DocumentParser`].
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Refine(#[from] LlmError),

    #[error("{0}")]
    UnsupportedFormat(String),
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Composes classification, extraction, truncation and refinement.
///
/// Holds only immutable state, so one instance can serve concurrent calls.
#[derive(Clone)]
pub struct DocumentParser {
    llm_default: LlmConfig,
    pdf: PdfExtractor,
    llm: LlmClient,
}

impl DocumentParser {
    pub fn new(llm_default: LlmConfig, pdf: PdfExtractor, llm: LlmClient) -> Self {
        Self {
            llm_default,
            pdf,
            llm,
        }
    }

    /// Operator-level refinement defaults.
    pub fn llm_default(&self) -> &LlmConfig {
        &self.llm_default
    }

    pub fn pdf(&self) -> &PdfExtractor {
        &self.pdf
    }

    /// Extract markdown from `doc`.
    ///
    /// PDF output is returned untouched. Everything else must yield some
    /// text and is cut to `max_input_chars` characters. Whitespace counts.
    pub fn extract(
        &self,
        doc: &DocumentReference,
        selector: &ExtractionSelector,
    ) -> Result<ExtractionOutcome, ParseError> {
        let strategy = classify_document(doc);
        debug!("{} classified as {}", doc.filename, strategy);

        if strategy == Strategy::Pdf {
            let markdown = self.pdf.extract(&doc.path, selector.page)?;
            let applied = selector
                .page
                .map(AppliedSelector::Page)
                .unwrap_or_default();
            return Ok(ExtractionOutcome::new(markdown, applied));
        }

        let (text, applied) = dispatch(strategy, doc, selector)?;
        if text.is_empty() {
            return Err(ExtractionError::NoTextExtracted.into());
        }

        let limit = self.llm_default.max_input_chars;
        let markdown = truncate_chars(&text, limit);
        if markdown.len() < text.len() {
            info!(
                "truncated {} to {} characters",
                doc.filename, limit
            );
        }
        Ok(ExtractionOutcome::new(markdown.to_string(), applied))
    }

    /// Extract, then rewrite the text through the configured provider.
    ///
    /// `overrides` are merged onto the operator defaults for this call only.
    /// PDFs are refused: their output is already structured markdown.
    pub async fn refine(
        &self,
        doc: &DocumentReference,
        selector: &ExtractionSelector,
        overrides: &LlmOverrides,
    ) -> Result<ExtractionOutcome, ParseError> {
        ensure_refinable(doc)?;
        let extracted = self.extract(doc, selector)?;
        self.refine_extracted(doc, extracted, overrides).await
    }

    /// Refine an outcome previously produced by [`Self::extract`].
    pub async fn refine_extracted(
        &self,
        doc: &DocumentReference,
        extracted: ExtractionOutcome,
        overrides: &LlmOverrides,
    ) -> Result<ExtractionOutcome, ParseError> {
        ensure_refinable(doc)?;
        let config = overrides.apply(&self.llm_default);
        let markdown = self
            .llm
            .refine(
                &extracted.markdown,
                &doc.filename,
                &doc.content_type,
                &config,
            )
            .await?;
        Ok(ExtractionOutcome::new(markdown, extracted.applied))
    }

    /// Worksheet names, in workbook order.
    pub fn list_sheets(&self, doc: &DocumentReference) -> Result<Vec<String>, ParseError> {
        match classify_document(doc) {
            Strategy::Spreadsheet => Ok(list_sheets(&doc.path)?),
            _ => Err(ParseError::UnsupportedFormat(
                "Document is not a spreadsheet.".to_string(),
            )),
        }
    }

    /// 1-based slide positions.
    pub fn list_slides(&self, doc: &DocumentReference) -> Result<Vec<u32>, ParseError> {
        match classify_document(doc) {
            Strategy::Presentation => Ok(list_slides(&doc.path)?),
            _ => Err(ParseError::UnsupportedFormat(
                "Document is not a presentation.".to_string(),
            )),
        }
    }

    /// Page count for PDFs, zero for everything else.
    pub fn page_count(&self, doc: &DocumentReference) -> Result<u32, ParseError> {
        if !doc.is_pdf() {
            return Ok(0);
        }
        Ok(self.pdf.page_count(&doc.path)?)
    }
}

fn ensure_refinable(doc: &DocumentReference) -> Result<(), ParseError> {
    if doc.is_pdf() {
        return Err(ParseError::UnsupportedFormat(
            "Refinement is not available for PDF documents.".to_string(),
        ));
    }
    Ok(())
}

fn dispatch(
    strategy: Strategy,
    doc: &DocumentReference,
    selector: &ExtractionSelector,
) -> Result<(String, AppliedSelector), ExtractionError> {
    let path = doc.path.as_path();
    let none = AppliedSelector::None;
    Ok(match strategy {
        Strategy::WordProcessing => (extract_docx(path)?, none),
        Strategy::Spreadsheet => {
            let (text, sheet) = extract_xlsx(path, selector.sheet_name())?;
            (text, sheet.map(AppliedSelector::Sheet).unwrap_or_default())
        }
        Strategy::Presentation => {
            let text = extract_pptx(path, selector.slide)?;
            let applied = selector.slide.map(AppliedSelector::Slide).unwrap_or_default();
            (text, applied)
        }
        Strategy::DelimitedText => (csv_to_markdown(&fs::read(path)?)?, none),
        Strategy::Markup => (html_to_text(&decode_lossy(&fs::read(path)?)), none),
        Strategy::GenericText => (decode_lossy(&fs::read(path)?), none),
        Strategy::BinaryFallback => (binary_fallback(&fs::read(path)?), none),
        Strategy::Pdf => {
            return Err(ExtractionError::UnsupportedFormat(
                "PDF documents are handled by the PDF extractor".to_string(),
            ))
        }
    })
}
