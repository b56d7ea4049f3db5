//! Presentations.

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use super::ooxml::{open_package, read_part, require_part, Package};
use super::ExtractionError;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS_PART: &str = "ppt/_rels/presentation.xml.rels";

/// Number every slide, 1..=N.
pub fn list_slides(path: &Path) -> Result<Vec<u32>, ExtractionError> {
    let mut package = open_package(path)?;
    let count = slide_parts(&mut package)?.len() as u32;
    Ok((1..=count).collect())
}

/// Render slides as markdown.
///
/// Each slide becomes a `# Slide N` line followed by the text of each of its
/// top-level text shapes that is non-blank. With a selector only that slide
/// is rendered; selectors outside `1..=N` fail with `OutOfRange`.
pub fn extract_pptx(path: &Path, slide: Option<u32>) -> Result<String, ExtractionError> {
    let mut package = open_package(path)?;
    let parts = slide_parts(&mut package)?;
    let total = parts.len() as u32;

    let selected: Vec<(u32, &String)> = match slide {
        Some(n) if n == 0 || n > total => {
            return Err(ExtractionError::slide_out_of_range(n, total));
        }
        Some(n) => vec![(n, &parts[(n - 1) as usize])],
        None => parts.iter().enumerate().map(|(i, p)| (i as u32 + 1, p)).collect(),
    };

    let mut lines = Vec::new();
    for (number, part) in selected {
        lines.push(format!("# Slide {}", number));
        let xml = require_part(&mut package, part)?;
        lines.extend(shape_texts(&xml)?);
    }

    Ok(lines.join("\n").trim().to_string())
}

/// Slide part names in presentation order.
///
/// Order comes from the presentation's slide id list resolved through its
/// relationships. Packages without that metadata fall back to the numeric
/// order of `ppt/slides/slideN.xml` entries.
fn slide_parts<R: Read + Seek>(package: &mut Package<R>) -> Result<Vec<String>, ExtractionError> {
    let presentation = read_part(package, PRESENTATION_PART)?;
    let rels = read_part(package, PRESENTATION_RELS_PART)?;

    if let (Some(presentation), Some(rels)) = (presentation, rels) {
        let targets = relationship_targets(&rels)?;
        let mut parts = Vec::new();
        for rel_id in slide_rel_ids(&presentation)? {
            match targets.get(&rel_id) {
                Some(target) => parts.push(resolve_target(target)),
                None => debug!("slide relationship {} has no target", rel_id),
            }
        }
        return Ok(parts);
    }

    let mut numbered: Vec<(u32, String)> = package
        .file_names()
        .filter_map(|name| {
            let n = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse::<u32>()
                .ok()?;
            Some((n, name.to_string()))
        })
        .collect();
    numbered.sort_by_key(|(n, _)| *n);
    Ok(numbered.into_iter().map(|(_, name)| name).collect())
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("ppt/{}", target),
    }
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Result<Option<String>, ExtractionError> {
    match e.try_get_attribute(key)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// `r:id` of every `p:sldId`, in list order.
fn slide_rel_ids(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"p:sldId" => {
                if let Some(id) = attribute(&e, "r:id")? {
                    ids.push(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(ids)
}

/// Relationship id to target map.
fn relationship_targets(xml: &str) -> Result<HashMap<String, String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attribute(&e, "Id")?, attribute(&e, "Target")?) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(targets)
}

/// Trimmed, non-blank text of each top-level shape with a text body.
///
/// Paragraphs within a shape are joined with newlines. Grouped shapes and
/// graphic frames are not descended into.
fn shape_texts(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut texts = Vec::new();

    let mut shape_at: Option<usize> = None;
    let mut paragraphs: Vec<String> = Vec::new();
    let mut in_body = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                if shape_at.is_none()
                    && name == b"p:sp"
                    && stack.last().map(|n| n.as_slice() == b"p:spTree").unwrap_or(false)
                {
                    shape_at = Some(stack.len());
                    paragraphs.clear();
                    in_body = false;
                }
                if shape_at.is_some() {
                    match name.as_slice() {
                        b"p:txBody" => in_body = true,
                        b"a:p" if in_body => paragraphs.push(String::new()),
                        _ => {}
                    }
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                if shape_at.is_some() && in_body {
                    match e.name().as_ref() {
                        b"a:p" => paragraphs.push(String::new()),
                        b"a:br" => {
                            if let Some(p) = paragraphs.last_mut() {
                                p.push('\n');
                            }
                        }
                        _ => {}
                    }
                }
            }
            Event::Text(t) => {
                let in_run_text = stack.last().map(|n| n.as_slice() == b"a:t").unwrap_or(false);
                if shape_at.is_some() && in_body && in_run_text {
                    if let Some(p) = paragraphs.last_mut() {
                        p.push_str(&t.unescape()?);
                    }
                }
            }
            Event::End(_) => {
                stack.pop();
                if shape_at == Some(stack.len()) {
                    let text = paragraphs.join("\n");
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        texts.push(trimmed.to_string());
                    }
                    shape_at = None;
                    in_body = false;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(texts)
}

#[cfg(test)]
mod tests {
    use super::super::ooxml::fixtures;
    use super::*;

    #[test]
    fn test_all_slides_rendered_in_order() {
        let bytes = fixtures::pptx(&[&["Title", "  "], &["Body\nMore"]]);
        let (_dir, path) = fixtures::write_temp("deck.pptx", &bytes);
        assert_eq!(
            extract_pptx(&path, None).unwrap(),
            "# Slide 1\nTitle\n# Slide 2\nBody\nMore"
        );
    }

    #[test]
    fn test_single_slide_keeps_its_number() {
        let bytes = fixtures::pptx(&[&["One"], &["Two"], &["Three"]]);
        let (_dir, path) = fixtures::write_temp("deck.pptx", &bytes);
        assert_eq!(extract_pptx(&path, Some(2)).unwrap(), "# Slide 2\nTwo");
    }

    #[test]
    fn test_slide_out_of_range() {
        let bytes = fixtures::pptx(&[&["One"], &["Two"]]);
        let (_dir, path) = fixtures::write_temp("deck.pptx", &bytes);
        for bad in [0, 3] {
            assert!(matches!(
                extract_pptx(&path, Some(bad)),
                Err(ExtractionError::OutOfRange { total: 2, .. })
            ));
        }
    }

    #[test]
    fn test_list_slides() {
        let bytes = fixtures::pptx(&[&["a"], &["b"], &["c"]]);
        let (_dir, path) = fixtures::write_temp("deck.pptx", &bytes);
        assert_eq!(list_slides(&path).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_zero_slides_is_empty() {
        let bytes = fixtures::pptx(&[]);
        let (_dir, path) = fixtures::write_temp("deck.pptx", &bytes);
        assert_eq!(extract_pptx(&path, None).unwrap(), "");
        assert!(list_slides(&path).unwrap().is_empty());
    }

    #[test]
    fn test_order_falls_back_to_part_numbers() {
        let bytes = fixtures::package(&[
            ("ppt/slides/slide10.xml", fixtures::slide_xml("")),
            (
                "ppt/slides/slide2.xml",
                fixtures::slide_xml(
                    "<p:sp><p:txBody><a:p><a:r><a:t>second</a:t></a:r></a:p></p:txBody></p:sp>",
                ),
            ),
        ]);
        let (_dir, path) = fixtures::write_temp("deck.pptx", &bytes);
        assert_eq!(extract_pptx(&path, Some(1)).unwrap(), "# Slide 1\nsecond");
    }

    #[test]
    fn test_grouped_shapes_are_skipped() {
        let xml = fixtures::slide_xml(
            "<p:grpSp><p:sp><p:txBody><a:p><a:r><a:t>inner</a:t></a:r></a:p></p:txBody></p:sp></p:grpSp>\
             <p:sp><p:txBody><a:p><a:r><a:t>outer</a:t></a:r></a:p></p:txBody></p:sp>",
        );
        assert_eq!(shape_texts(&xml).unwrap(), vec!["outer".to_string()]);
    }
}
