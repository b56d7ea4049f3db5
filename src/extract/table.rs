//! Pipe-table rendering for delimited text.

use super::ExtractionError;

/// Render a header row and body rows as a markdown pipe table.
///
/// Rows are emitted with their own cell count; no padding or truncation is
/// applied when widths disagree with the header.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render_row(headers));
    lines.push(format!(
        "| {} |",
        headers.iter().map(|_| "---").collect::<Vec<_>>().join(" | ")
    ));
    lines.extend(rows.iter().map(|row| render_row(row)));
    lines.join("\n")
}

fn render_row(cells: &[String]) -> String {
    format!("| {} |", cells.join(" | "))
}

/// Render parsed rows as a table, using the first row as headers.
///
/// When every header cell is empty, headers become `Column 1..Column N`
/// where N is the first row's width, and the blank row stays in the body.
/// An empty input renders as an empty string.
pub fn rows_to_markdown(rows: Vec<Vec<String>>) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };

    if first.iter().all(|h| h.is_empty()) {
        let headers: Vec<String> = (1..=first.len()).map(|i| format!("Column {}", i)).collect();
        return render_table(&headers, &rows);
    }

    render_table(first, &rows[1..])
}

/// Parse comma-delimited bytes and render them as a markdown table.
///
/// Invalid UTF-8 is replaced rather than rejected. Records may have
/// differing widths. Blank lines carry no record and are not rendered.
pub fn csv_to_markdown(bytes: &[u8]) -> Result<String, ExtractionError> {
    let text = String::from_utf8_lossy(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(rows_to_markdown(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_simple_csv() {
        let md = csv_to_markdown(b"a,b\n1,2\n3,4").unwrap();
        assert_eq!(md, "| a | b |\n| --- | --- |\n| 1 | 2 |\n| 3 | 4 |");
    }

    #[test]
    fn test_empty_input_is_empty_string() {
        assert_eq!(csv_to_markdown(b"").unwrap(), "");
        assert_eq!(rows_to_markdown(Vec::new()), "");
    }

    #[test]
    fn test_blank_headers_are_synthesized() {
        let md = csv_to_markdown(b",\n1,2").unwrap();
        assert_eq!(
            md,
            "| Column 1 | Column 2 |\n| --- | --- |\n|  |  |\n| 1 | 2 |"
        );
    }

    #[test]
    fn test_partially_blank_headers_are_kept() {
        let md = rows_to_markdown(vec![strings(&["", "b"]), strings(&["1", "2"])]);
        assert!(md.starts_with("|  | b |\n"));
    }

    #[test]
    fn test_ragged_rows_are_not_padded() {
        let md = csv_to_markdown(b"a,b,c\n1\n1,2,3,4").unwrap();
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines[1], "| --- | --- | --- |");
        assert_eq!(lines[2], "| 1 |");
        assert_eq!(lines[3], "| 1 | 2 | 3 | 4 |");
    }

    #[test]
    fn test_blank_lines_produce_no_rows() {
        let md = csv_to_markdown(b"a,b\n\n1,2\n\n").unwrap();
        assert_eq!(md, "| a | b |\n| --- | --- |\n| 1 | 2 |");
    }

    #[test]
    fn test_header_only() {
        let md = csv_to_markdown(b"name,age\n").unwrap();
        assert_eq!(md, "| name | age |\n| --- | --- |");
    }

    #[test]
    fn test_quoted_fields_keep_commas() {
        let md = csv_to_markdown(b"q\n\"a, b\"").unwrap();
        assert_eq!(md, "| q |\n| --- |\n| a, b |");
    }

    #[test]
    fn test_invalid_utf8_does_not_fail() {
        let md = csv_to_markdown(b"h\n\xff\xfeok").unwrap();
        assert!(md.contains("ok"));
    }
}
