//! Row mapping, validation and canonicalization.
//!
//! Raw rows come in keyed by free-text column labels. A [`ColumnTable`]
//! turns them into fixed-shape records; anything that fails validation or
//! numeric coercion is returned as a [`RejectedRow`] instead of aborting the
//! load.

use std::collections::{BTreeMap, HashSet};

use crate::config::{ColumnTable, NormalizeConfig};
use crate::error::{MatchError, RecordError};
use crate::model::{
    CatalogProduct, Field, OperationKind, OperationRecord, Period, RawValue, RejectedRow,
    SourceRow,
};

const REASON_EMPTY: &str = "empty";

/// Records that passed normalization plus the rows that did not.
#[derive(Debug)]
pub struct Normalized<T> {
    pub items: Vec<T>,
    pub rejected: Vec<RejectedRow>,
}

impl<T> Default for Normalized<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Map catalog rows to products. Rows with an empty id or name, or a
/// duplicate id, are rejected. A catalog with no usable product is fatal.
pub fn load_catalog(
    source: &str,
    rows: &[SourceRow],
    columns: &ColumnTable,
) -> Result<Normalized<CatalogProduct>, MatchError> {
    let mut out = Normalized::default();
    let mut seen: HashSet<String> = HashSet::new();

    for row in rows {
        match catalog_product(row, columns) {
            Ok(product) => {
                if !seen.insert(product.id.clone()) {
                    let mut errors = BTreeMap::new();
                    errors.insert(
                        columns.label_for(Field::Id, row),
                        format!("duplicate id '{}'", product.id),
                    );
                    reject(&mut out.rejected, source, row.row, RecordError::Validation(errors));
                    continue;
                }
                out.items.push(product);
            }
            Err(error) => reject(&mut out.rejected, source, row.row, error),
        }
    }

    if out.items.is_empty() {
        return Err(MatchError::CatalogLoad(format!(
            "{source}: no usable products in {} row(s)",
            rows.len()
        )));
    }

    log::info!(
        "catalog {source}: {} product(s), {} rejected row(s)",
        out.items.len(),
        out.rejected.len()
    );
    Ok(out)
}

/// Map a single catalog row.
pub fn catalog_product(row: &SourceRow, columns: &ColumnTable) -> Result<CatalogProduct, RecordError> {
    let mut errors = BTreeMap::new();
    for field in [Field::Id, Field::Name] {
        if columns.get(row, field).is_empty() {
            errors.insert(columns.label_for(field, row), REASON_EMPTY.to_string());
        }
    }
    if !errors.is_empty() {
        return Err(RecordError::Validation(errors));
    }

    Ok(CatalogProduct {
        id: columns.get(row, Field::Id).to_text(),
        name: columns.get(row, Field::Name).to_text().to_lowercase(),
        dose: columns.get(row, Field::Dose).to_text().to_lowercase(),
        manufacturer: columns.get(row, Field::Manufacturer).to_text().to_lowercase(),
    })
}

// ---------------------------------------------------------------------------
// Operation records
// ---------------------------------------------------------------------------

/// Turns raw incoming/outgoing rows into canonical records.
pub struct Normalizer<'a> {
    config: &'a NormalizeConfig,
}

impl<'a> Normalizer<'a> {
    pub fn new(config: &'a NormalizeConfig) -> Self {
        Self { config }
    }

    /// Normalize every row of one source file. The period is attached by the
    /// caller; it is not derived from row content.
    pub fn normalize_rows(
        &self,
        kind: OperationKind,
        source: &str,
        period: Period,
        rows: &[SourceRow],
        columns: &ColumnTable,
    ) -> Normalized<OperationRecord> {
        let mut out = Normalized::default();
        for row in rows {
            match self.operation_record(kind, source, period, row, columns) {
                Ok(record) => out.items.push(record),
                Err(error) => reject(&mut out.rejected, source, row.row, error),
            }
        }
        if !out.rejected.is_empty() {
            log::info!(
                "{kind} {source}: {} record(s), {} rejected row(s)",
                out.items.len(),
                out.rejected.len()
            );
        }
        out
    }

    /// Validate, coerce and canonicalize one row.
    pub fn operation_record(
        &self,
        kind: OperationKind,
        source: &str,
        period: Period,
        row: &SourceRow,
        columns: &ColumnTable,
    ) -> Result<OperationRecord, RecordError> {
        let counterpart = columns.get(row, Field::Counterpart);
        let amount_raw = columns.get(row, Field::Amount);
        let unit_raw = columns.get(row, Field::UnitPrice);
        let total_raw = columns.get(row, Field::TotalPrice);

        let mut errors = BTreeMap::new();
        for field in [Field::Counterpart, Field::Name, Field::Amount] {
            if columns.get(row, field).is_empty() {
                errors.insert(columns.label_for(field, row), REASON_EMPTY.to_string());
            }
        }
        let counterpart_text = counterpart.to_text();
        // sentinel codes only occur in vendor columns
        if kind == OperationKind::Incoming
            && self
                .config
                .sentinel_counterparts
                .iter()
                .any(|s| s.trim() == counterpart_text)
            && !counterpart.is_empty()
        {
            errors.insert(
                columns.label_for(Field::Counterpart, row),
                format!("sentinel value '{counterpart_text}'"),
            );
        }
        if unit_raw.is_empty() && total_raw.is_empty() {
            let field = if columns.has(Field::TotalPrice) {
                Field::TotalPrice
            } else {
                Field::UnitPrice
            };
            errors.insert(columns.label_for(field, row), REASON_EMPTY.to_string());
        }
        if !errors.is_empty() {
            return Err(RecordError::Validation(errors));
        }

        let amount = self.coerce_amount(amount_raw, &columns.label_for(Field::Amount, row))?;
        if amount <= 0.0 {
            let mut errors = BTreeMap::new();
            errors.insert(
                columns.label_for(Field::Amount, row),
                format!("must be positive, got {amount}"),
            );
            return Err(RecordError::Validation(errors));
        }

        let unit_price = coerce_price(unit_raw, &columns.label_for(Field::UnitPrice, row))?;
        let total_price = coerce_price(total_raw, &columns.label_for(Field::TotalPrice, row))?;
        let (unit_price, total_price) = derive_prices(amount, unit_price, total_price);

        let mut record = OperationRecord {
            kind,
            source: source.to_string(),
            row: row.row,
            period,
            counterpart: counterpart_text,
            name: columns.get(row, Field::Name).to_text(),
            dose: columns.get(row, Field::Dose).to_text(),
            manufacturer: columns.get(row, Field::Manufacturer).to_text(),
            amount,
            unit_price,
            total_price,
            matched_id: None,
            candidates: Vec::new(),
            resolved: false,
        };
        record.canonicalize();
        Ok(record)
    }

    /// Numbers pass through; numeric text is parsed; anything else must be
    /// a known bad token from the correction table.
    pub fn coerce_amount(&self, raw: &RawValue, label: &str) -> Result<f64, RecordError> {
        if let Some(n) = parse_number(raw) {
            return Ok(n);
        }
        let token = raw.to_text().to_lowercase();
        self.config
            .corrections
            .iter()
            .find(|(bad, _)| bad.trim().to_lowercase() == token)
            .map(|(_, value)| *value)
            .ok_or_else(|| RecordError::Normalization {
                field: label.to_string(),
                value: raw.to_text(),
            })
    }
}

fn parse_number(raw: &RawValue) -> Option<f64> {
    match raw {
        RawValue::Number(n) if n.is_finite() => Some(*n),
        RawValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn coerce_price(raw: &RawValue, label: &str) -> Result<Option<f64>, RecordError> {
    if raw.is_empty() {
        return Ok(None);
    }
    parse_number(raw)
        .map(Some)
        .ok_or_else(|| RecordError::Normalization {
            field: label.to_string(),
            value: raw.to_text(),
        })
}

/// Fill whichever of unit / total price is missing. A zero amount leaves the
/// unit price undefined rather than failing.
pub fn derive_prices(
    amount: f64,
    unit_price: Option<f64>,
    total_price: Option<f64>,
) -> (Option<f64>, Option<f64>) {
    match (unit_price, total_price) {
        (Some(unit), None) => (Some(unit), Some(amount * unit)),
        (None, Some(total)) if amount != 0.0 => (Some(total / amount), Some(total)),
        other => other,
    }
}

fn reject(rejected: &mut Vec<RejectedRow>, source: &str, row: usize, error: RecordError) {
    log::warn!("{source} row {row}: {error}");
    rejected.push(RejectedRow {
        source: source.to_string(),
        row,
        error,
    });
}
