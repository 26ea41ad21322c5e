// Source file discovery

use std::path::{Path, PathBuf};

use regex::Regex;
use skumatch_recon::model::{OperationKind, Period};

use crate::sheet::SOURCE_EXTENSIONS;

/// One period file of an operation stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: OperationKind,
    pub period: Period,
}

impl SourceFile {
    /// File name used to tag records and rejected-row listings.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Classifies file names into a stream kind and a period.
pub struct SourceClassifier {
    period: Regex,
    incoming_keyword: String,
    outgoing_keyword: String,
}

impl SourceClassifier {
    pub fn new(incoming_keyword: &str, outgoing_keyword: &str) -> Self {
        Self {
            // "2016.3", "2016年3", "201603"
            period: Regex::new(r"(20\d{2})[.|年]?(\d{1,2})").expect("static regex"),
            incoming_keyword: incoming_keyword.to_string(),
            outgoing_keyword: outgoing_keyword.to_string(),
        }
    }

    pub fn kind(&self, file_name: &str) -> Option<OperationKind> {
        if file_name.contains(&self.incoming_keyword) {
            Some(OperationKind::Incoming)
        } else if file_name.contains(&self.outgoing_keyword) {
            Some(OperationKind::Outgoing)
        } else {
            None
        }
    }

    pub fn period(&self, file_name: &str) -> Option<Period> {
        let caps = self.period.captures(file_name)?;
        let year: i32 = caps.get(1)?.as_str().parse().ok()?;
        let month: u32 = caps.get(2)?.as_str().parse().ok()?;
        Period::new(year, month)
    }
}

/// Walk `root` and return every dated source file of a known stream,
/// ordered by kind, period, then path.
pub fn discover(root: &Path, classifier: &SourceClassifier) -> Result<Vec<SourceFile>, String> {
    let mut files = Vec::new();
    walk(root, classifier, &mut files)?;
    files.sort_by(|a, b| {
        (a.kind == OperationKind::Outgoing, a.period, &a.path)
            .cmp(&(b.kind == OperationKind::Outgoing, b.period, &b.path))
    });
    Ok(files)
}

fn walk(dir: &Path, classifier: &SourceClassifier, out: &mut Vec<SourceFile>) -> Result<(), String> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| format!("cannot read {}: {e}", dir.display()))?;
    for entry in entries {
        let entry = entry.map_err(|e| e.to_string())?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, classifier, out)?;
            continue;
        }

        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        let name = entry.file_name().to_string_lossy().into_owned();
        // spreadsheet lock files
        if !supported || name.starts_with("~$") {
            continue;
        }

        let Some(kind) = classifier.kind(&name) else {
            log::debug!("skipping {}: no stream keyword", path.display());
            continue;
        };
        match classifier.period(&name) {
            Some(period) => out.push(SourceFile { path, kind, period }),
            None => log::warn!("skipping {}: no period in file name", path.display()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn classifier() -> SourceClassifier {
        SourceClassifier::new("购进", "销售")
    }

    #[test]
    fn test_period_formats() {
        let c = classifier();
        assert_eq!(c.period("2016.3购进.xls"), Period::new(2016, 3));
        assert_eq!(c.period("2017年11月销售.xlsx"), Period::new(2017, 11));
        assert_eq!(c.period("销售201705.xls"), Period::new(2017, 5));
        assert_eq!(c.period("销售.xls"), None);
        assert_eq!(c.period("2016.13购进.xls"), None);
    }

    #[test]
    fn test_kind_by_keyword() {
        let c = classifier();
        assert_eq!(c.kind("2016.3购进.xls"), Some(OperationKind::Incoming));
        assert_eq!(c.kind("2016.3销售.xls"), Some(OperationKind::Outgoing));
        assert_eq!(c.kind("2016.3库存.xls"), None);
    }

    #[test]
    fn test_discover_walks_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("2016");
        fs::create_dir(&nested).unwrap();
        for name in ["2016.4购进.csv", "2016.2销售.xls", "notes.txt", "~$2016.1购进.xls", "购进.xls"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::write(nested.join("2016.1购进.xlsx"), "").unwrap();

        let files = discover(dir.path(), &classifier()).unwrap();
        let summary: Vec<(OperationKind, String)> =
            files.iter().map(|f| (f.kind, f.period.to_string())).collect();
        assert_eq!(
            summary,
            vec![
                (OperationKind::Incoming, "2016.01".to_string()),
                (OperationKind::Incoming, "2016.04".to_string()),
                (OperationKind::Outgoing, "2016.02".to_string()),
            ]
        );
        assert_eq!(files[1].name(), "2016.4购进.csv");
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(&dir.path().join("nope"), &classifier()).is_err());
    }
}
