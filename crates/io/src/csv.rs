// CSV source import

use std::io::Read;
use std::path::Path;

use skumatch_recon::model::{RawValue, SourceRow};

use crate::sheet::rows_from_grid;

pub fn import(path: &Path, header_row: usize) -> Result<Vec<SourceRow>, String> {
    let content = read_file_as_utf8(path)?;
    import_from_string(&content, sniff_delimiter(&content), header_row)
}

/// Pick the delimiter that occurs most often in the first few lines.
/// Title rows above the header carry no delimiters, so a single line is not
/// enough. Ties keep the comma.
fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content.lines().take(10).collect();
    let mut best = b',';
    let mut best_count = 0usize;
    for delim in [b',', b'\t', b';'] {
        let count: usize = sample
            .iter()
            .map(|line| line.bytes().filter(|b| *b == delim).count())
            .sum();
        if count > best_count {
            best = delim;
            best_count = count;
        }
    }
    best
}

/// Read a file and convert to UTF-8. Non-UTF-8 input is decoded as GB18030,
/// the usual encoding of Chinese spreadsheet exports.
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file =
        std::fs::File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| format!("{}: {e}", path.display()))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s.trim_start_matches('\u{feff}').to_string()),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::GB18030.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

fn import_from_string(content: &str, delimiter: u8, header_row: usize) -> Result<Vec<SourceRow>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid: Vec<Vec<RawValue>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        grid.push(
            record
                .iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        RawValue::Empty
                    } else {
                        RawValue::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(rows_from_grid(grid, header_row))
}
