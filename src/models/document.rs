//! Document references and extraction selectors.
//!
//! A [`DocumentReference`] is everything the extractors need to know about a
//! stored file: where it lives, what it was called when it arrived and what
//! the uploader claimed its content type to be.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Content type assumed when none is supplied.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A stored document ready for extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReference {
    /// Opaque identifier assigned by whoever stored the document.
    #[serde(default)]
    pub id: String,
    /// Location of the stored bytes.
    pub path: PathBuf,
    /// Original filename as uploaded.
    pub filename: String,
    /// Declared content type, lowercased.
    pub content_type: String,
    /// Lowercased extension including the leading dot, or empty.
    pub extension: String,
}

impl DocumentReference {
    /// Build a reference, deriving the extension from the original filename.
    pub fn new(path: impl Into<PathBuf>, filename: &str, content_type: Option<&str>) -> Self {
        let path = path.into();
        let mut extension = extension_of(Path::new(filename));
        if extension.is_empty() {
            extension = extension_of(&path);
        }

        Self {
            id: String::new(),
            path,
            filename: filename.to_string(),
            content_type: normalize_content_type(content_type),
            extension,
        }
    }

    /// Build a reference for a local file, guessing the content type from
    /// its extension when none is given.
    pub fn from_path(path: impl Into<PathBuf>, content_type: Option<&str>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        let guessed;
        let content_type = match content_type {
            Some(ct) => Some(ct),
            None => {
                guessed = mime_guess::from_path(&path).first().map(|m| m.to_string());
                guessed.as_deref()
            }
        };

        Self::new(path, &filename, content_type).with_id(filename)
    }

    /// Attach the identifier the document is known by.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn is_pdf(&self) -> bool {
        self.extension == ".pdf"
    }
}

/// Lowercased extension with a leading dot, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

fn normalize_content_type(content_type: Option<&str>) -> String {
    content_type
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_lowercase()
}

/// Optional narrowing of an extraction to one page, sheet or slide.
///
/// Page and slide numbers are 1-based. Each field is only consulted by the
/// extractor it applies to; the others are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide: Option<u32>,
}

impl ExtractionSelector {
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Default::default()
        }
    }

    pub fn sheet(name: impl Into<String>) -> Self {
        Self {
            sheet: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn slide(slide: u32) -> Self {
        Self {
            slide: Some(slide),
            ..Default::default()
        }
    }

    /// Sheet name, treating an empty string as no selection.
    pub fn sheet_name(&self) -> Option<&str> {
        self.sheet.as_deref().filter(|s| !s.is_empty())
    }
}

/// The selector an extractor actually honoured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AppliedSelector {
    #[default]
    None,
    Page(u32),
    /// Name of the worksheet that was rendered, which may differ from the
    /// requested name when the request did not match.
    Sheet(String),
    Slide(u32),
}

impl AppliedSelector {
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Page(p) => Some(*p),
            _ => None,
        }
    }

    pub fn sheet(&self) -> Option<&str> {
        match self {
            Self::Sheet(s) => Some(s),
            _ => None,
        }
    }

    pub fn slide(&self) -> Option<u32> {
        match self {
            Self::Slide(s) => Some(*s),
            _ => None,
        }
    }
}

/// Markdown produced for a document plus the selector that shaped it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub markdown: String,
    pub applied: AppliedSelector,
}

impl ExtractionOutcome {
    pub fn new(markdown: String, applied: AppliedSelector) -> Self {
        Self { markdown, applied }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_is_lowercased_with_dot() {
        let doc = DocumentReference::new("/tmp/abc", "Report.PDF", Some("application/pdf"));
        assert_eq!(doc.extension, ".pdf");
        assert!(doc.is_pdf());
    }

    #[test]
    fn test_extension_falls_back_to_stored_path() {
        let doc = DocumentReference::new("/tmp/abc.xlsx", "upload", None);
        assert_eq!(doc.extension, ".xlsx");
        assert_eq!(doc.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_id_is_empty_until_assigned() {
        let doc = DocumentReference::new("/tmp/abc.txt", "notes.txt", None);
        assert_eq!(doc.id, "");
        assert_eq!(doc.with_id("abc").id, "abc");
    }

    #[test]
    fn test_missing_extension_is_empty() {
        let doc = DocumentReference::new("/tmp/abc", "README", Some("Text/Plain"));
        assert_eq!(doc.extension, "");
        assert_eq!(doc.content_type, "text/plain");
    }

    #[test]
    fn test_from_path_guesses_content_type() {
        let doc = DocumentReference::from_path("/tmp/data.csv", None);
        assert_eq!(doc.filename, "data.csv");
        assert_eq!(doc.id, "data.csv");
        assert_eq!(doc.content_type, "text/csv");
    }

    #[test]
    fn test_empty_sheet_name_is_no_selection() {
        assert_eq!(ExtractionSelector::sheet("").sheet_name(), None);
        assert_eq!(ExtractionSelector::sheet("Q1").sheet_name(), Some("Q1"));
    }
}
