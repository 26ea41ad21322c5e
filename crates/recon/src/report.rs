//! Review pages for records that did not get a catalog id.
//!
//! Each page holds at most `page_size` records. Every record row is followed
//! by its best suggestions, ranked by a fresh similarity of the concatenated
//! product fields.

use serde::Serialize;

use crate::config::ReportConfig;
use crate::error::MatchError;
use crate::model::{CatalogProduct, OperationKind, OperationRecord, RecordBatch};
use crate::similarity::similarity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewRowKind {
    Unmatched,
    Suggestion,
}

impl std::fmt::Display for ReviewRowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unmatched => write!(f, "unmatched"),
            Self::Suggestion => write!(f, "suggestion"),
        }
    }
}

/// One output row. Column order follows [`headers`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewRow {
    pub kind: ReviewRowKind,
    pub date: String,
    pub counterpart: String,
    pub id: String,
    pub name: String,
    pub dose: String,
    pub manufacturer: String,
}

impl ReviewRow {
    fn for_record(record: &OperationRecord) -> Self {
        Self {
            kind: ReviewRowKind::Unmatched,
            date: record.period.to_string(),
            counterpart: record.counterpart.clone(),
            id: String::new(),
            name: record.name.clone(),
            dose: record.dose.clone(),
            manufacturer: record.manufacturer.clone(),
        }
    }

    fn for_suggestion(product: &CatalogProduct) -> Self {
        Self {
            kind: ReviewRowKind::Suggestion,
            date: String::new(),
            counterpart: String::new(),
            id: product.id.clone(),
            name: product.name.clone(),
            dose: product.dose.clone(),
            manufacturer: product.manufacturer.clone(),
        }
    }

    pub fn cells(&self) -> [&str; 7] {
        let kind = match self.kind {
            ReviewRowKind::Unmatched => "unmatched",
            ReviewRowKind::Suggestion => "suggestion",
        };
        [
            kind,
            &self.date,
            &self.counterpart,
            &self.id,
            &self.name,
            &self.dose,
            &self.manufacturer,
        ]
    }
}

/// Column headers for a review page of `kind`.
pub fn headers(kind: OperationKind) -> [&'static str; 7] {
    [
        "type",
        "date",
        kind.counterpart_label(),
        "id",
        "name",
        "dose",
        "manufacturer",
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewPage {
    pub kind: OperationKind,
    /// 1-based page number.
    pub number: usize,
    /// Records on this page (suggestion rows not counted).
    pub record_count: usize,
    pub rows: Vec<ReviewRow>,
}

/// Accepts finished pages, one artifact per page.
pub trait ReviewSink {
    /// Called once before the pages of `kind` are written. Sinks that
    /// persist pages drop the ones left over from an earlier run here.
    fn begin(&mut self, _kind: OperationKind) -> Result<(), MatchError> {
        Ok(())
    }

    fn write_page(&mut self, page: &ReviewPage) -> Result<(), MatchError>;
}

/// Collects pages in memory.
impl ReviewSink for Vec<ReviewPage> {
    fn write_page(&mut self, page: &ReviewPage) -> Result<(), MatchError> {
        self.push(page.clone());
        Ok(())
    }
}

/// Candidates of `record` ordered by descending similarity to the record,
/// truncated to `max`. Equal scores keep their scan order.
pub fn ranked_suggestions(record: &OperationRecord, max: usize) -> Vec<&CatalogProduct> {
    let info = record.product_info();
    let mut scored: Vec<(f64, &CatalogProduct)> = record
        .candidates
        .iter()
        .map(|c| (similarity(&info, &c.product_info()), c))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().take(max).map(|(_, c)| c).collect()
}

pub struct ReviewReporter {
    page_size: usize,
    max_suggestions: usize,
    emit_empty_page: bool,
}

impl ReviewReporter {
    pub fn new(page_size: usize, max_suggestions: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            max_suggestions,
            emit_empty_page: false,
        }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            emit_empty_page: config.emit_empty_page,
            ..Self::new(config.page_size, config.max_suggestions)
        }
    }

    pub fn with_empty_page(mut self, emit: bool) -> Self {
        self.emit_empty_page = emit;
        self
    }

    /// Build the pages for every scanned record of `kind` without a catalog
    /// id. Matched records and records the scan has not reached yet are
    /// ignored.
    pub fn pages(&self, kind: OperationKind, records: &[OperationRecord]) -> Vec<ReviewPage> {
        let pending = records.iter().filter(|r| !r.resolved).count();
        if pending > 0 {
            log::warn!("{kind} review: {pending} record(s) not scanned yet, left out");
        }
        let unresolved: Vec<&OperationRecord> = records
            .iter()
            .filter(|r| r.resolved && !r.is_matched())
            .collect();

        if unresolved.is_empty() {
            if self.emit_empty_page {
                return vec![ReviewPage {
                    kind,
                    number: 1,
                    record_count: 0,
                    rows: Vec::new(),
                }];
            }
            return Vec::new();
        }

        unresolved
            .chunks(self.page_size)
            .enumerate()
            .map(|(i, chunk)| {
                let mut rows = Vec::new();
                for record in chunk {
                    rows.push(ReviewRow::for_record(record));
                    rows.extend(
                        ranked_suggestions(record, self.max_suggestions)
                            .into_iter()
                            .map(ReviewRow::for_suggestion),
                    );
                }
                ReviewPage {
                    kind,
                    number: i + 1,
                    record_count: chunk.len(),
                    rows,
                }
            })
            .collect()
    }

    /// Render every page of `batch` into `sink`. Returns the page count.
    pub fn write<S: ReviewSink + ?Sized>(
        &self,
        batch: &RecordBatch,
        sink: &mut S,
    ) -> Result<usize, MatchError> {
        let pages = self.pages(batch.kind, &batch.records);
        sink.begin(batch.kind)?;
        for page in &pages {
            sink.write_page(page)?;
        }
        log::info!(
            "{} review: {} page(s), {} record(s)",
            batch.kind,
            pages.len(),
            pages.iter().map(|p| p.record_count).sum::<usize>()
        );
        Ok(pages.len())
    }
}
