use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::RecordError;

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// A single cell as handed over by the spreadsheet reader.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Empty,
    Text(String),
    Number(f64),
}

impl RawValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Text form used for comparison. Integral numbers drop the fractional
    /// part so `1024.0` reads as `1024`.
    pub fn to_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => format_number(*n),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// One parsed source row: column label → raw cell value.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    /// 1-based row number in the source sheet.
    pub row: usize,
    pub values: HashMap<String, RawValue>,
}

impl SourceRow {
    pub fn new(row: usize) -> Self {
        Self {
            row,
            values: HashMap::new(),
        }
    }

    pub fn with(mut self, label: &str, value: RawValue) -> Self {
        self.values.insert(label.to_string(), value);
        self
    }
}

/// Record fields a source column can be mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    Name,
    Dose,
    Manufacturer,
    Counterpart,
    Amount,
    UnitPrice,
    TotalPrice,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id => write!(f, "id"),
            Self::Name => write!(f, "name"),
            Self::Dose => write!(f, "dose"),
            Self::Manufacturer => write!(f, "manufacturer"),
            Self::Counterpart => write!(f, "counterpart"),
            Self::Amount => write!(f, "amount"),
            Self::UnitPrice => write!(f, "unit_price"),
            Self::TotalPrice => write!(f, "total_price"),
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: String,
    pub name: String,
    pub dose: String,
    pub manufacturer: String,
}

impl CatalogProduct {
    /// name + dose + manufacturer, the string compared for combined similarity.
    pub fn product_info(&self) -> String {
        format!("{}{}{}", self.name, self.dose, self.manufacturer)
    }
}

// ---------------------------------------------------------------------------
// Operation records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Goods received from a vendor.
    Incoming,
    /// Goods shipped to a client.
    Outgoing,
}

impl OperationKind {
    pub fn counterpart_label(&self) -> &'static str {
        match self {
            Self::Incoming => "vendor",
            Self::Outgoing => "client",
        }
    }

    /// Checkpoint store key for this stream.
    pub fn checkpoint_key(&self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incoming => write!(f, "incoming"),
            Self::Outgoing => write!(f, "outgoing"),
        }
    }
}

/// Accounting period a source file covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub kind: OperationKind,
    /// Source file name the record came from.
    pub source: String,
    /// 1-based row in the source file.
    pub row: usize,
    pub period: Period,
    /// Vendor for incoming records, client for outgoing ones.
    pub counterpart: String,
    pub name: String,
    pub dose: String,
    pub manufacturer: String,
    pub amount: f64,
    pub unit_price: Option<f64>,
    pub total_price: Option<f64>,
    /// Catalog id, set only on an exact match.
    #[serde(default)]
    pub matched_id: Option<String>,
    /// Review suggestions, populated only when `matched_id` is absent.
    #[serde(default)]
    pub candidates: Vec<CatalogProduct>,
    #[serde(default)]
    pub resolved: bool,
}

impl OperationRecord {
    pub fn product_info(&self) -> String {
        format!("{}{}{}", self.name, self.dose, self.manufacturer)
    }

    pub fn is_matched(&self) -> bool {
        self.matched_id.is_some()
    }

    /// Lower-case the comparison fields. Running it twice changes nothing.
    pub fn canonicalize(&mut self) {
        for field in [&mut self.name, &mut self.dose, &mut self.manufacturer] {
            let lowered = field.trim().to_lowercase();
            if *field != lowered {
                *field = lowered;
            }
        }
    }
}

/// All records of one kind, as owned by the scan for the length of a run.
/// This is also the checkpoint payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordBatch {
    pub kind: OperationKind,
    pub records: Vec<OperationRecord>,
}

impl RecordBatch {
    pub fn new(kind: OperationKind, records: Vec<OperationRecord>) -> Self {
        Self { kind, records }
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &OperationRecord> {
        self.records.iter().filter(|r| !r.is_matched())
    }
}

// ---------------------------------------------------------------------------
// Rejected rows
// ---------------------------------------------------------------------------

/// A source row that never made it into a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    pub source: String,
    pub row: usize,
    pub error: RecordError,
}

// ---------------------------------------------------------------------------
// Matching outcome + scan summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Record was resolved before this call; nothing changed.
    AlreadyResolved,
    ExactMatch { id: String },
    CandidateSet { count: usize },
    /// Nothing in the catalog scored above zero (or the catalog is empty).
    Unresolved,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub total: usize,
    pub scanned: usize,
    pub skipped: usize,
    pub matched: usize,
    pub with_candidates: usize,
    pub unresolved: usize,
    pub checkpoints_written: usize,
}

impl ScanSummary {
    pub fn record(&mut self, outcome: &MatchOutcome) {
        match outcome {
            MatchOutcome::AlreadyResolved => self.skipped += 1,
            MatchOutcome::ExactMatch { .. } => {
                self.scanned += 1;
                self.matched += 1;
            }
            MatchOutcome::CandidateSet { .. } => {
                self.scanned += 1;
                self.with_candidates += 1;
            }
            MatchOutcome::Unresolved => {
                self.scanned += 1;
                self.unresolved += 1;
            }
        }
    }
}
