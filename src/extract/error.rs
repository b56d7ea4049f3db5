//! Errors raised while turning a stored document into text.

use thiserror::Error;

/// Errors that can occur during extraction.
///
/// Library failures (io, zip, xml, spreadsheet, pdf, csv) all collapse into
/// [`ExtractionError::Failed`] so callers only ever see this closed set.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("{unit} {value} is out of range (document has {total})")]
    OutOfRange {
        unit: &'static str,
        value: u32,
        total: u32,
    },

    #[error("No text could be extracted from this document.")]
    NoTextExtracted,

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Extraction failed: {0}")]
    Failed(String),
}

impl ExtractionError {
    pub fn page_out_of_range(value: u32, total: u32) -> Self {
        Self::OutOfRange {
            unit: "Page",
            value,
            total,
        }
    }

    pub fn slide_out_of_range(value: u32, total: u32) -> Self {
        Self::OutOfRange {
            unit: "Slide",
            value,
            total,
        }
    }
}

macro_rules! failed_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ExtractionError {
                fn from(err: $ty) -> Self {
                    ExtractionError::Failed(err.to_string())
                }
            }
        )*
    };
}

failed_from!(
    std::io::Error,
    zip::result::ZipError,
    quick_xml::Error,
    quick_xml::events::attributes::AttrError,
    calamine::XlsxError,
    lopdf::Error,
    csv::Error,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message_names_unit() {
        let err = ExtractionError::slide_out_of_range(4, 3);
        assert_eq!(err.to_string(), "Slide 4 is out of range (document has 3)");
    }

    #[test]
    fn test_io_error_becomes_failed() {
        let err: ExtractionError =
            std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into();
        assert!(matches!(err, ExtractionError::Failed(ref m) if m == "disk gone"));
    }
}
