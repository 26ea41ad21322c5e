use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::MatchError;
use crate::model::{Field, OperationKind, RawValue, SourceRow};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MatchConfig {
    pub name: String,
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub columns: ColumnsConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Column tables
// ---------------------------------------------------------------------------

static EMPTY_VALUE: RawValue = RawValue::Empty;

/// Source column label → record field. Several labels may map to the same
/// field (sheets from different periods use different headings); the first
/// non-empty one in sorted label order wins. Order in the config file does
/// not matter.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ColumnTable(BTreeMap<String, Field>);

impl ColumnTable {
    pub fn new<I, L>(entries: I) -> Self
    where
        I: IntoIterator<Item = (L, Field)>,
        L: Into<String>,
    {
        Self(entries.into_iter().map(|(l, f)| (l.into(), f)).collect())
    }

    pub fn has(&self, field: Field) -> bool {
        self.0.values().any(|f| *f == field)
    }

    /// Labels mapped to `field`, sorted by label.
    pub fn labels_for(&self, field: Field) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(move |(_, f)| **f == field)
            .map(|(l, _)| l.as_str())
    }

    /// Preferred label for error listings: the first label (sorted) present
    /// in `row`, else the first label mapped to `field`, else the field name.
    pub fn label_for(&self, field: Field, row: &SourceRow) -> String {
        self.labels_for(field)
            .find(|l| row.values.contains_key(*l))
            .or_else(|| self.labels_for(field).next())
            .map(str::to_string)
            .unwrap_or_else(|| field.to_string())
    }

    /// First non-empty value among the labels mapped to `field`.
    pub fn get<'r>(&self, row: &'r SourceRow, field: Field) -> &'r RawValue {
        self.labels_for(field)
            .filter_map(|l| row.values.get(l))
            .find(|v| !v.is_empty())
            .unwrap_or(&EMPTY_VALUE)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn default_catalog_columns() -> ColumnTable {
    ColumnTable::new([
        ("系统编码", Field::Id),
        ("品名", Field::Name),
        ("规格", Field::Dose),
        ("生产企业", Field::Manufacturer),
    ])
}

fn default_incoming_columns() -> ColumnTable {
    ColumnTable::new([
        ("供应商", Field::Counterpart),
        ("供货商", Field::Counterpart),
        ("品名", Field::Name),
        ("规格", Field::Dose),
        ("生产企业", Field::Manufacturer),
        ("数量", Field::Amount),
        ("购进单价", Field::UnitPrice),
        ("购进金额", Field::TotalPrice),
        ("购进含税金额", Field::TotalPrice),
    ])
}

fn default_outgoing_columns() -> ColumnTable {
    ColumnTable::new([
        ("商品去向", Field::Counterpart),
        ("品名", Field::Name),
        ("规格", Field::Dose),
        ("生产企业", Field::Manufacturer),
        ("数量", Field::Amount),
        ("含税金额", Field::TotalPrice),
        ("金额", Field::TotalPrice),
    ])
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnsConfig {
    #[serde(default = "default_incoming_columns")]
    pub incoming: ColumnTable,
    #[serde(default = "default_outgoing_columns")]
    pub outgoing: ColumnTable,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            incoming: default_incoming_columns(),
            outgoing: default_outgoing_columns(),
        }
    }
}

impl ColumnsConfig {
    pub fn for_kind(&self, kind: OperationKind) -> &ColumnTable {
        match kind {
            OperationKind::Incoming => &self.incoming,
            OperationKind::Outgoing => &self.outgoing,
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog + sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub file: String,
    #[serde(default)]
    pub header_row: usize,
    #[serde(default = "default_catalog_columns")]
    pub columns: ColumnTable,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_sources_root")]
    pub root: String,
    #[serde(default = "default_incoming_keyword")]
    pub incoming_keyword: String,
    #[serde(default = "default_outgoing_keyword")]
    pub outgoing_keyword: String,
    #[serde(default)]
    pub header_row: usize,
}

fn default_sources_root() -> String {
    "data".into()
}

fn default_incoming_keyword() -> String {
    "购进".into()
}

fn default_outgoing_keyword() -> String {
    "销售".into()
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            root: default_sources_root(),
            incoming_keyword: default_incoming_keyword(),
            outgoing_keyword: default_outgoing_keyword(),
            header_row: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Classification thresholds, checked in order: every field ≥ `field`,
/// then combined ≥ `combined_exact`, then combined ≥ `candidate`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_field_threshold")]
    pub field: f64,
    #[serde(default = "default_combined_exact")]
    pub combined_exact: f64,
    #[serde(default = "default_candidate")]
    pub candidate: f64,
}

fn default_field_threshold() -> f64 {
    0.7
}

fn default_combined_exact() -> f64 {
    0.8
}

fn default_candidate() -> f64 {
    0.5
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            field: default_field_threshold(),
            combined_exact: default_combined_exact(),
            candidate: default_candidate(),
        }
    }
}

// ---------------------------------------------------------------------------
// Scan + Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: String,
}

fn default_checkpoint_interval() -> usize {
    500
}

fn default_progress_every() -> usize {
    5
}

fn default_checkpoint_dir() -> String {
    ".skumatch".into()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: default_checkpoint_interval(),
            progress_every: default_progress_every(),
            checkpoint_dir: default_checkpoint_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    /// Write one empty page when nothing is left unresolved.
    #[serde(default)]
    pub emit_empty_page: bool,
    #[serde(default = "default_review_dir")]
    pub output_dir: String,
}

fn default_page_size() -> usize {
    500
}

fn default_max_suggestions() -> usize {
    10
}

fn default_review_dir() -> String {
    "review".into()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_suggestions: default_max_suggestions(),
            emit_empty_page: false,
            output_dir: default_review_dir(),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalize + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct NormalizeConfig {
    /// Known malformed quantity tokens and their hand-verified values.
    #[serde(default = "default_corrections")]
    pub corrections: BTreeMap<String, f64>,
    /// Counterpart codes that mark a row as broken at the source.
    #[serde(default = "default_sentinels")]
    pub sentinel_counterparts: Vec<String>,
}

fn default_corrections() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("0.4g".to_string(), 300.0),
        ("8粒".to_string(), 100.0),
        ("新乡市亚太".to_string(), 10.0),
        ("becton dickinson and".to_string(), 2.0),
    ])
}

fn default_sentinels() -> Vec<String> {
    vec!["42".into()]
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            corrections: default_corrections(),
            sentinel_counterparts: default_sentinels(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
    #[serde(default = "default_errors_dir")]
    pub errors_dir: String,
}

fn default_export_dir() -> String {
    "export".into()
}

fn default_errors_dir() -> String {
    "errors".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            export_dir: default_export_dir(),
            errors_dir: default_errors_dir(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MatchConfig {
    pub fn from_toml(input: &str) -> Result<Self, MatchError> {
        let config: MatchConfig =
            toml::from_str(input).map_err(|e| MatchError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        let t = &self.thresholds;
        for (name, value) in [
            ("field", t.field),
            ("combined_exact", t.combined_exact),
            ("candidate", t.candidate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MatchError::ConfigValidation(format!(
                    "thresholds.{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if t.candidate > t.combined_exact {
            return Err(MatchError::ConfigValidation(format!(
                "thresholds.candidate ({}) exceeds thresholds.combined_exact ({})",
                t.candidate, t.combined_exact
            )));
        }

        if self.scan.checkpoint_interval == 0 {
            return Err(MatchError::ConfigValidation(
                "scan.checkpoint_interval must be at least 1".into(),
            ));
        }
        if self.scan.progress_every == 0 {
            return Err(MatchError::ConfigValidation(
                "scan.progress_every must be at least 1".into(),
            ));
        }
        if self.report.page_size == 0 {
            return Err(MatchError::ConfigValidation(
                "report.page_size must be at least 1".into(),
            ));
        }

        for field in [Field::Id, Field::Name] {
            if !self.catalog.columns.has(field) {
                return Err(MatchError::ConfigValidation(format!(
                    "catalog.columns: no column mapped to '{field}'"
                )));
            }
        }

        for kind in [OperationKind::Incoming, OperationKind::Outgoing] {
            let table = self.columns.for_kind(kind);
            for field in [Field::Counterpart, Field::Name, Field::Amount] {
                if !table.has(field) {
                    return Err(MatchError::ConfigValidation(format!(
                        "columns.{kind}: no column mapped to '{field}'"
                    )));
                }
            }
            if !table.has(Field::UnitPrice) && !table.has(Field::TotalPrice) {
                return Err(MatchError::ConfigValidation(format!(
                    "columns.{kind}: needs a unit_price or total_price column"
                )));
            }
            if table.has(Field::Id) {
                return Err(MatchError::ConfigValidation(format!(
                    "columns.{kind}: 'id' is assigned by matching, not read from source"
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
