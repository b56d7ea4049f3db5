//! Word-processing documents.
//!
//! Only paragraphs directly under the document body are read; table cells,
//! headers and footers are not part of the output.

use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::ooxml::{open_package, require_part};
use super::ExtractionError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Extract body paragraphs joined with newlines, trimmed as a whole.
///
/// Blank paragraphs are kept so spacing between blocks survives.
pub fn extract_docx(path: &Path) -> Result<String, ExtractionError> {
    let mut package = open_package(path)?;
    let xml = require_part(&mut package, DOCUMENT_PART)?;
    let paragraphs = body_paragraphs(&xml)?;

    Ok(paragraphs.join("\n").trim().to_string())
}

/// Text of each top-level `w:p` in document order.
fn body_paragraphs(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut paragraphs = Vec::new();
    // Depth at which the current body paragraph was opened.
    let mut open_at: Option<usize> = None;
    let mut current = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                if name == b"w:p" && open_at.is_none() && parent_is(&stack, b"w:body") {
                    open_at = Some(stack.len());
                    current.clear();
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                if e.name().as_ref() == b"w:p" && open_at.is_none() && parent_is(&stack, b"w:body")
                {
                    paragraphs.push(String::new());
                } else if open_at.is_some() && parent_is(&stack, b"w:r") {
                    match e.name().as_ref() {
                        b"w:tab" => current.push('\t'),
                        b"w:br" | b"w:cr" => current.push('\n'),
                        _ => {}
                    }
                }
            }
            Event::Text(t) => {
                if open_at.is_some() && parent_is(&stack, b"w:t") {
                    current.push_str(&t.unescape()?);
                }
            }
            Event::End(_) => {
                stack.pop();
                if open_at == Some(stack.len()) {
                    paragraphs.push(std::mem::take(&mut current));
                    open_at = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn parent_is(stack: &[Vec<u8>], name: &[u8]) -> bool {
    stack.last().map(|n| n.as_slice() == name).unwrap_or(false)
}
