//! HTML tag stripping.

use scraper::{Html, Node};

/// Elements whose text never reaches the output.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Strip markup from an HTML document.
///
/// Every non-blank text node becomes one trimmed line, in document order.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut lines = Vec::new();

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|el| SKIPPED_ELEMENTS.contains(&el.name()))
                .unwrap_or(false)
        });
        if skipped {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }

    lines.join("\n")
}
