//! Spreadsheet workbooks via calamine.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, SheetType, Xlsx};
use tracing::debug;

use super::ExtractionError;

type Workbook = Xlsx<BufReader<File>>;

fn open(path: &Path) -> Result<Workbook, ExtractionError> {
    Ok(open_workbook(path)?)
}

/// Worksheet names in workbook order. Chart sheets are not listed.
fn worksheet_names(workbook: &Workbook) -> Vec<String> {
    workbook
        .sheets_metadata()
        .iter()
        .filter(|sheet| matches!(sheet.typ, SheetType::WorkSheet))
        .map(|sheet| sheet.name.clone())
        .collect()
}

/// List worksheet names.
pub fn list_sheets(path: &Path) -> Result<Vec<String>, ExtractionError> {
    let workbook = open(path)?;
    Ok(worksheet_names(&workbook))
}

/// Render worksheets as `# Sheet: <name>` blocks of pipe-joined rows.
///
/// With a sheet name that matches, only that sheet is rendered. A name that
/// matches nothing falls back to the first worksheet rather than failing.
/// Returns the markdown and the name of the sheet actually rendered when a
/// selection was requested.
pub fn extract_xlsx(
    path: &Path,
    sheet: Option<&str>,
) -> Result<(String, Option<String>), ExtractionError> {
    let mut workbook = open(path)?;
    let names = worksheet_names(&workbook);

    let (targets, applied) = match sheet {
        Some(wanted) => {
            let chosen = match names.iter().find(|n| n.as_str() == wanted) {
                Some(name) => Some(name.clone()),
                None => {
                    debug!("sheet {:?} not found, using first worksheet", wanted);
                    names.first().cloned()
                }
            };
            (chosen.iter().cloned().collect::<Vec<_>>(), chosen)
        }
        None => (names, None),
    };

    let mut lines = Vec::new();
    for name in &targets {
        lines.push(format!("# Sheet: {}", name));
        let range = workbook.worksheet_range(name)?;
        lines.extend(render_rows(&range));
    }

    Ok((lines.join("\n").trim().to_string(), applied))
}

/// One line per row from A1 to the last used cell.
///
/// Positions are absolute, so leading empty rows and columns keep their
/// place as blank lines and empty cells.
fn render_rows(range: &Range<Data>) -> Vec<String> {
    let Some((last_row, last_col)) = range.end() else {
        return Vec::new();
    };

    (0..=last_row)
        .map(|r| {
            (0..=last_col)
                .map(|c| range.get_value((r, c)).map(format_cell).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(" | ")
                .trim()
                .to_string()
        })
        .collect()
}

/// Display value of a cell, as the workbook last computed it.
fn format_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{:.0}", f)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(dt) => dt.clone(),
        Data::DurationIso(d) => d.clone(),
        Data::Error(e) => format!("{:?}", e),
    }
}
