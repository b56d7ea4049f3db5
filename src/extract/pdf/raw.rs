//! Per-page plain text, the fallback that always works on a readable PDF.

use std::path::Path;

use lopdf::Document;
use tracing::warn;

use crate::extract::ExtractionError;

/// Placeholder emitted for pages without extractable text.
pub const EMPTY_PAGE_PLACEHOLDER: &str = "_No text found._";

/// Anything that can report a page count and per-page text.
pub trait PageSource {
    fn page_count(&self) -> u32;

    /// Text of a 1-based page.
    fn page_text(&self, number: u32) -> String;
}

/// Page source backed by lopdf.
pub struct LopdfSource {
    document: Document,
    pages: Vec<u32>,
}

impl LopdfSource {
    pub fn open(path: &Path) -> Result<Self, ExtractionError> {
        let document = Document::load(path)?;
        let pages = document.get_pages().keys().copied().collect();
        Ok(Self { document, pages })
    }
}

impl PageSource for LopdfSource {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text(&self, number: u32) -> String {
        let Some(page) = self.pages.get(number.saturating_sub(1) as usize) else {
            return String::new();
        };
        match self.document.extract_text(&[*page]) {
            Ok(text) => text,
            Err(e) => {
                warn!("could not read text of page {}: {}", number, e);
                String::new()
            }
        }
    }
}

/// Fail unless `1 <= page <= total`.
pub fn check_page(page: u32, total: u32) -> Result<(), ExtractionError> {
    if page == 0 || page > total {
        return Err(ExtractionError::page_out_of_range(page, total));
    }
    Ok(())
}

fn section(number: u32, text: &str) -> String {
    let text = text.trim();
    let body = if text.is_empty() {
        EMPTY_PAGE_PLACEHOLDER
    } else {
        text
    };
    format!("## Page {}\n\n{}", number, body)
}

/// Render one page, or every page in order separated by a blank line.
pub fn render_pages(source: &dyn PageSource, page: Option<u32>) -> Result<String, ExtractionError> {
    let total = source.page_count();
    match page {
        Some(n) => {
            check_page(n, total)?;
            Ok(section(n, &source.page_text(n)))
        }
        None => Ok((1..=total)
            .map(|n| section(n, &source.page_text(n)))
            .collect::<Vec<_>>()
            .join("\n\n")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pages(Vec<&'static str>);

    impl PageSource for Pages {
        fn page_count(&self) -> u32 {
            self.0.len() as u32
        }
        fn page_text(&self, number: u32) -> String {
            self.0[(number - 1) as usize].to_string()
        }
    }

    #[test]
    fn test_all_pages_with_placeholder() {
        let md = render_pages(&Pages(vec!["", "Hello"]), None).unwrap();
        assert_eq!(md, "## Page 1\n\n_No text found._\n\n## Page 2\n\nHello");
    }

    #[test]
    fn test_single_page() {
        let md = render_pages(&Pages(vec!["one", " two \n"]), Some(2)).unwrap();
        assert_eq!(md, "## Page 2\n\ntwo");
    }

    #[test]
    fn test_whitespace_page_gets_placeholder() {
        let md = render_pages(&Pages(vec!["  \n\t"]), Some(1)).unwrap();
        assert_eq!(md, "## Page 1\n\n_No text found._");
    }

    #[test]
    fn test_page_out_of_range() {
        let pages = Pages(vec!["a", "b"]);
        for bad in [0, 3] {
            assert!(matches!(
                render_pages(&pages, Some(bad)),
                Err(ExtractionError::OutOfRange { value, total: 2, .. }) if value == bad
            ));
        }
    }

    #[test]
    fn test_no_pages_without_selector_is_empty() {
        assert_eq!(render_pages(&Pages(vec![]), None).unwrap(), "");
    }
}
