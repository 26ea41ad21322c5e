// Review workbook writer

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Color, Format, Workbook};
use skumatch_recon::error::MatchError;
use skumatch_recon::model::OperationKind;
use skumatch_recon::report::{headers, ReviewPage, ReviewRowKind, ReviewSink};

const HEADER_FILL: u32 = 0x38761D;
const RECORD_FONT: u32 = 0xC93E14;

/// Writes each review page to `<dir>/<kind>_review_<n>.xlsx`.
pub struct XlsxReviewSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl XlsxReviewSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn page_path(&self, page: &ReviewPage) -> PathBuf {
        self.dir
            .join(format!("{}_review_{}.xlsx", page.kind, page.number))
    }
}

impl ReviewSink for XlsxReviewSink {
    /// Remove the `<kind>_review_*.xlsx` pages of an earlier run so a rerun
    /// with fewer pages leaves none behind.
    fn begin(&mut self, kind: OperationKind) -> Result<(), MatchError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(MatchError::Io(format!("{}: {e}", self.dir.display()))),
        };
        let prefix = format!("{kind}_review_");
        for entry in entries {
            let path = entry
                .map_err(|e| MatchError::Io(format!("{}: {e}", self.dir.display())))?
                .path();
            let stale = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".xlsx"));
            if stale {
                std::fs::remove_file(&path)
                    .map_err(|e| MatchError::Io(format!("{}: {e}", path.display())))?;
                log::debug!("removed {}", path.display());
            }
        }
        Ok(())
    }

    fn write_page(&mut self, page: &ReviewPage) -> Result<(), MatchError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| MatchError::Io(format!("{}: {e}", self.dir.display())))?;
        let path = self.page_path(page);
        write_page(page, &path).map_err(|e| MatchError::Sink(format!("{}: {e}", path.display())))?;
        log::debug!("wrote {}", path.display());
        self.written.push(path);
        Ok(())
    }
}

fn write_page(page: &ReviewPage, path: &Path) -> Result<(), rust_xlsxwriter::XlsxError> {
    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL));
    let record_format = Format::new().set_bold().set_font_color(Color::RGB(RECORD_FONT));
    let suggestion_format = Format::new();

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, label) in headers(page.kind).iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *label, &header_format)?;
    }
    worksheet.set_column_width(2, 24)?;
    worksheet.set_column_width(4, 24)?;
    worksheet.set_column_width(6, 24)?;
    worksheet.set_freeze_panes(1, 0)?;

    for (i, row) in page.rows.iter().enumerate() {
        let format = match row.kind {
            ReviewRowKind::Unmatched => &record_format,
            ReviewRowKind::Suggestion => &suggestion_format,
        };
        for (col, cell) in row.cells().iter().enumerate() {
            worksheet.write_string_with_format(i as u32 + 1, col as u16, *cell, format)?;
        }
    }

    workbook.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto, Data, Reader};
    use skumatch_recon::model::{CatalogProduct, OperationRecord, Period, RecordBatch};
    use skumatch_recon::report::ReviewReporter;
    use tempfile::tempdir;

    fn unresolved(i: usize) -> OperationRecord {
        OperationRecord {
            kind: OperationKind::Incoming,
            source: "2016.3购进.xls".into(),
            row: i + 2,
            period: Period::new(2016, 3).unwrap(),
            counterpart: format!("vendor {i}"),
            name: "aspirn".into(),
            dose: "500mg".into(),
            manufacturer: "acme".into(),
            amount: 1.0,
            unit_price: Some(1.0),
            total_price: Some(1.0),
            matched_id: None,
            candidates: vec![CatalogProduct {
                id: "1024".into(),
                name: "aspirin".into(),
                dose: "500mg".into(),
                manufacturer: "acme".into(),
            }],
            resolved: true,
        }
    }

    #[test]
    fn test_one_workbook_per_page() {
        let dir = tempdir().unwrap();
        let batch = RecordBatch::new(OperationKind::Incoming, (0..3).map(unresolved).collect());
        let mut sink = XlsxReviewSink::new(dir.path().join("review"));
        let pages = ReviewReporter::new(2, 10).write(&batch, &mut sink).unwrap();

        assert_eq!(pages, 2);
        let names: Vec<String> = sink
            .written()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["incoming_review_1.xlsx", "incoming_review_2.xlsx"]);
    }

    #[test]
    fn test_rerun_removes_stale_pages() {
        let dir = tempdir().unwrap();
        let review = dir.path().join("review");
        let mut batch = RecordBatch::new(OperationKind::Incoming, (0..3).map(unresolved).collect());
        let reporter = ReviewReporter::new(1, 10);
        assert_eq!(reporter.write(&batch, &mut XlsxReviewSink::new(&review)).unwrap(), 3);

        std::fs::write(review.join("outgoing_review_1.xlsx"), "other kind").unwrap();
        for record in &mut batch.records {
            record.matched_id = Some("1024".into());
        }
        assert_eq!(reporter.write(&batch, &mut XlsxReviewSink::new(&review)).unwrap(), 0);

        let mut left: Vec<String> = std::fs::read_dir(&review)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(left, vec!["outgoing_review_1.xlsx"]);
    }

    #[test]
    fn test_page_contents() {
        let dir = tempdir().unwrap();
        let batch = RecordBatch::new(OperationKind::Incoming, vec![unresolved(0)]);
        let mut sink = XlsxReviewSink::new(dir.path());
        ReviewReporter::new(500, 10).write(&batch, &mut sink).unwrap();

        let mut workbook = open_workbook_auto(&sink.written()[0]).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        let cell = |r: u32, c: u32| match range.get_value((r, c)) {
            Some(Data::String(s)) => s.clone(),
            _ => String::new(),
        };
        assert_eq!(cell(0, 2), "vendor");
        assert_eq!(cell(1, 0), "unmatched");
        assert_eq!(cell(1, 1), "2016.03");
        assert_eq!(cell(1, 2), "vendor 0");
        assert_eq!(cell(2, 0), "suggestion");
        assert_eq!(cell(2, 3), "1024");
        assert_eq!(cell(2, 2), "");
    }
}
