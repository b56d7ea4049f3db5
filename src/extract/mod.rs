//! Format-specific text extraction.
//!
//! Supported formats:
//! - PDF: semantic converters with a raw per-page fallback (`pdf`)
//! - Word-processing documents (`docx`)
//! - Spreadsheets with sheet selection (`spreadsheet`)
//! - Presentations with slide selection (`pptx`)
//! - CSV rendered as a markdown table (`table`)
//! - HTML with tags stripped (`markup`)
//! - Plain text, and base64 for anything else (`text`)
//!
//! [`classify`] picks which of these applies to a document.

mod classify;
mod docx;
mod error;
mod markup;
mod ooxml;
pub mod pdf;
mod pptx;
mod spreadsheet;
mod table;
mod text;

pub use classify::{
    classify, classify_document, is_presentation_extension, is_spreadsheet_extension, Strategy,
    TEXT_EXTENSIONS,
};
pub use docx::extract_docx;
pub use error::ExtractionError;
pub use markup::html_to_text;
pub use pdf::PdfExtractor;
pub use pptx::{extract_pptx, list_slides};
pub use spreadsheet::{extract_xlsx, list_sheets};
pub use table::{csv_to_markdown, render_table, rows_to_markdown};
pub use text::{binary_fallback, decode_lossy};

#[cfg(test)]
pub(crate) use ooxml::fixtures as office_fixtures;
#[cfg(test)]
pub(crate) use pdf::fixtures as pdf_fixtures;
