// Matched-record export workbooks

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook};
use skumatch_recon::error::MatchError;
use skumatch_recon::export::{ExportGroup, ExportSink, EXPORT_HEADERS};
use skumatch_recon::model::OperationKind;

/// Counterpart names are cut to this many characters in file names.
const NAME_LIMIT: usize = 20;

/// Writes one workbook per group to `<dir>/<kind>/<year>/<counterpart>.xlsx`.
pub struct XlsxExportSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
    taken: HashSet<PathBuf>,
}

impl XlsxExportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
            taken: HashSet::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Pick a path for `group`. Two counterparts that truncate to the same
    /// name get numbered suffixes instead of overwriting each other.
    fn path_for(&mut self, group: &ExportGroup) -> PathBuf {
        let folder = self
            .dir
            .join(group.kind.to_string())
            .join(group.year.to_string());
        let stem = file_stem(&group.counterpart);
        let mut path = folder.join(format!("{stem}.xlsx"));
        let mut n = 2;
        while self.taken.contains(&path) {
            path = folder.join(format!("{stem}_{n}.xlsx"));
            n += 1;
        }
        self.taken.insert(path.clone());
        path
    }
}

/// File-system safe, truncated counterpart name.
pub fn file_stem(counterpart: &str) -> String {
    let cleaned: String = counterpart
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(NAME_LIMIT)
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

impl ExportSink for XlsxExportSink {
    /// Drop the `<dir>/<kind>` tree of an earlier run; counterparts that no
    /// longer have matched records must not keep their old workbooks.
    fn begin(&mut self, kind: OperationKind) -> Result<(), MatchError> {
        let folder = self.dir.join(kind.to_string());
        match std::fs::remove_dir_all(&folder) {
            Ok(()) => log::debug!("removed {}", folder.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(MatchError::Io(format!("{}: {e}", folder.display()))),
        }
        self.taken.retain(|p| !p.starts_with(&folder));
        Ok(())
    }

    fn write_group(&mut self, group: &ExportGroup) -> Result<(), MatchError> {
        let path = self.path_for(group);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MatchError::Io(format!("{}: {e}", parent.display())))?;
        }
        write_group(group, &path).map_err(|e| MatchError::Sink(format!("{}: {e}", path.display())))?;
        self.written.push(path);
        Ok(())
    }
}

fn write_group(group: &ExportGroup, path: &Path) -> Result<(), rust_xlsxwriter::XlsxError> {
    let bold = Format::new().set_bold();
    let money = Format::new().set_num_format("0.00");

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(group.year.to_string())?;

    for (col, label) in EXPORT_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *label, &bold)?;
    }

    for (i, row) in group.rows.iter().enumerate() {
        let r = i as u32 + 1;
        worksheet.write_string(r, 0, &row.counterpart)?;
        worksheet.write_string(r, 1, &row.id)?;
        worksheet.write_string(r, 2, &row.name)?;
        worksheet.write_string(r, 3, &row.dose)?;
        worksheet.write_string(r, 4, &row.manufacturer)?;
        worksheet.write_number(r, 5, row.amount)?;
        if let Some(unit) = row.unit_price {
            worksheet.write_number_with_format(r, 6, unit, &money)?;
        }
        if let Some(total) = row.total_price {
            worksheet.write_number_with_format(r, 7, total, &money)?;
        }
    }

    workbook.save(path)
}
