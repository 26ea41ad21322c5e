// Spreadsheet source import (xls, xlsx, xlsb, ods, csv)

use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use skumatch_recon::model::{RawValue, SourceRow};

/// Extensions `read_rows` understands.
pub const SOURCE_EXTENSIONS: [&str; 5] = ["xls", "xlsx", "xlsb", "ods", "csv"];

/// Read the first sheet of `path` into labelled rows. `header_row` is the
/// 0-based row holding the column labels; rows above it are ignored.
pub fn read_rows(path: &Path, header_row: usize) -> Result<Vec<SourceRow>, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => crate::csv::import(path, header_row),
        "xls" | "xlsx" | "xlsb" | "ods" => import_workbook(path, header_row),
        _ => Err(format!("{}: unsupported file type", path.display())),
    }
}

fn import_workbook(path: &Path, header_row: usize) -> Result<Vec<SourceRow>, String> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open {}: {e}", path.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| format!("{} contains no sheets", path.display()))?
        .map_err(|e| format!("Failed to read first sheet of {}: {e}", path.display()))?;

    // Range start offset (data may not begin at A1)
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut grid: Vec<Vec<RawValue>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![RawValue::Empty; start_col as usize];
        cells.extend(row.iter().map(raw_value));
        grid.push(cells);
    }
    Ok(rows_from_grid(grid, header_row))
}

fn raw_value(cell: &Data) -> RawValue {
    match cell {
        Data::Empty => RawValue::Empty,
        Data::String(s) if s.trim().is_empty() => RawValue::Empty,
        Data::String(s) => RawValue::Text(s.clone()),
        Data::Float(n) => RawValue::Number(*n),
        Data::Int(n) => RawValue::Number(*n as f64),
        Data::Bool(b) => RawValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => RawValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawValue::Text(s.clone()),
        Data::Error(e) => RawValue::Text(format!("#{e:?}")),
    }
}

/// Turn a cell grid into rows keyed by the labels of `header_row`.
///
/// Row numbers are 1-based sheet rows. Blank rows are dropped, unlabelled
/// columns are ignored, and a repeated label keeps its first column.
pub(crate) fn rows_from_grid(grid: Vec<Vec<RawValue>>, header_row: usize) -> Vec<SourceRow> {
    let Some(header) = grid.get(header_row) else {
        return Vec::new();
    };
    let mut labels: Vec<Option<String>> = Vec::with_capacity(header.len());
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (col, cell) in header.iter().enumerate() {
        let label = cell.to_text();
        if label.is_empty() || seen.contains_key(&label) {
            labels.push(None);
        } else {
            seen.insert(label.clone(), col);
            labels.push(Some(label));
        }
    }

    grid.into_iter()
        .enumerate()
        .skip(header_row + 1)
        .filter(|(_, cells)| cells.iter().any(|c| !c.is_empty()))
        .map(|(idx, cells)| {
            let mut row = SourceRow::new(idx + 1);
            for (col, label) in labels.iter().enumerate() {
                if let Some(label) = label {
                    let value = cells.get(col).cloned().unwrap_or(RawValue::Empty);
                    row.values.insert(label.clone(), value);
                }
            }
            row
        })
        .collect()
}
