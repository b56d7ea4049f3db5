//! Strategy selection from extension and declared content type.

use crate::models::DocumentReference;

/// Extensions always read as plain text.
pub const TEXT_EXTENSIONS: &[&str] = &[".txt", ".md", ".csv", ".json", ".log"];

/// Extraction strategy chosen for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Pdf,
    WordProcessing,
    Spreadsheet,
    Presentation,
    DelimitedText,
    GenericText,
    Markup,
    BinaryFallback,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::WordProcessing => "word_processing",
            Self::Spreadsheet => "spreadsheet",
            Self::Presentation => "presentation",
            Self::DelimitedText => "delimited_text",
            Self::GenericText => "generic_text",
            Self::Markup => "markup",
            Self::BinaryFallback => "binary_fallback",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pick a strategy. Rules are checked in order and the first match wins.
///
/// Both inputs are expected lowercased; the extension carries its leading
/// dot. The declared content type only matters for the `text/` family.
/// Anything unrecognized lands on the binary fallback.
pub fn classify(extension: &str, content_type: &str) -> Strategy {
    match extension {
        ".pdf" => return Strategy::Pdf,
        ".docx" => return Strategy::WordProcessing,
        ".xlsx" | ".xlsm" => return Strategy::Spreadsheet,
        ".pptx" => return Strategy::Presentation,
        _ => {}
    }
    if TEXT_EXTENSIONS.contains(&extension) || content_type.starts_with("text/") {
        if extension == ".csv" {
            return Strategy::DelimitedText;
        }
        return Strategy::GenericText;
    }
    if matches!(extension, ".html" | ".htm") {
        return Strategy::Markup;
    }
    Strategy::BinaryFallback
}

/// Classify a document reference.
pub fn classify_document(doc: &DocumentReference) -> Strategy {
    classify(&doc.extension, &doc.content_type)
}

/// Whether the spreadsheet listing applies (`.xlsx`/`.xlsm` only).
pub fn is_spreadsheet_extension(extension: &str) -> bool {
    matches!(extension, ".xlsx" | ".xlsm")
}

/// Whether the slide listing applies (`.pptx` only).
pub fn is_presentation_extension(extension: &str) -> bool {
    extension == ".pptx"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_formats_by_extension() {
        assert_eq!(classify(".pdf", "application/octet-stream"), Strategy::Pdf);
        assert_eq!(classify(".docx", ""), Strategy::WordProcessing);
        assert_eq!(classify(".xlsx", ""), Strategy::Spreadsheet);
        assert_eq!(classify(".xlsm", ""), Strategy::Spreadsheet);
        assert_eq!(classify(".pptx", ""), Strategy::Presentation);
    }

    #[test]
    fn test_declared_type_alone_does_not_select_office_or_pdf() {
        assert_eq!(classify("", "application/pdf"), Strategy::BinaryFallback);
        assert_eq!(
            classify(".bin", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
            Strategy::BinaryFallback
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        for ext in [".pdf", ".docx", ".csv", ".html", ".zip", ""] {
            assert_eq!(classify(ext, "text/plain"), classify(ext, "text/plain"));
        }
    }

    #[test]
    fn test_csv_is_delimited_only_by_extension() {
        assert_eq!(classify(".csv", "text/csv"), Strategy::DelimitedText);
        assert_eq!(classify(".csv", "application/octet-stream"), Strategy::DelimitedText);
        assert_eq!(classify(".dat", "text/csv"), Strategy::GenericText);
    }

    #[test]
    fn test_text_family() {
        for ext in [".txt", ".md", ".json", ".log"] {
            assert_eq!(classify(ext, "application/octet-stream"), Strategy::GenericText);
        }
        assert_eq!(classify(".bin", "text/plain"), Strategy::GenericText);
    }

    #[test]
    fn test_text_content_type_wins_over_html_extension() {
        assert_eq!(classify(".html", "text/html"), Strategy::GenericText);
        assert_eq!(classify(".html", "application/octet-stream"), Strategy::Markup);
        assert_eq!(classify(".htm", ""), Strategy::Markup);
    }

    #[test]
    fn test_pdf_takes_precedence_over_text() {
        assert_eq!(classify(".pdf", "text/plain"), Strategy::Pdf);
        assert_eq!(classify(".txt", "application/pdf"), Strategy::GenericText);
    }

    #[test]
    fn test_unknown_is_binary() {
        assert_eq!(classify(".bin", "application/octet-stream"), Strategy::BinaryFallback);
        assert_eq!(classify("", ""), Strategy::BinaryFallback);
    }
}
