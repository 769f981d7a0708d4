//! Cross-tabulation of cross-table query results.
//!
//! Rows are (geography, period) pairs, columns are product values. Only
//! `Detail` rows feed the table; every row total, column total, region
//! subtotal and the grand total is recomputed from them. Subtotal rows coming
//! back from the database are used solely to cross-check the recomputation,
//! and a mismatch is reported as a [`DataQualityWarning`].

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

use crate::classify::{classify_cross_table, CrossTableLevel};
use crate::models::{AggregatedRow, AggregationRequest, Measure};

/// Geography label of the grand-total row and period label of subtotal rows.
pub const TOTAL_LABEL: &str = "total";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowKind {
    Detail,
    RegionSubtotal,
    GrandTotal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTableRow {
    pub kind: RowKind,
    pub geo: String,
    pub period: String,
    pub cells: Vec<f64>,
    pub total: f64,
}

impl CrossTableRow {
    fn new(kind: RowKind, geo: String, period: String, cells: Vec<f64>) -> Self {
        let total = cells.iter().sum();
        Self {
            kind,
            geo,
            period,
            cells,
            total,
        }
    }
}

/// A recomputed total disagrees with another source of the same figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQualityWarning {
    pub check: String,
    pub recomputed: f64,
    pub reported: f64,
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: recomputed {} but found {} (difference {})",
            self.check,
            self.recomputed,
            self.reported,
            self.recomputed - self.reported
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTable {
    pub measure: Measure,
    pub geo_level: String,
    pub time_level: String,
    pub product_level: String,
    pub year: Option<i32>,
    /// Product values, one per column.
    pub columns: Vec<String>,
    /// Detail rows, each geography followed by its subtotal row.
    pub rows: Vec<CrossTableRow>,
    /// Per-column sums over all detail rows.
    pub column_totals: Vec<f64>,
    pub grand_total: CrossTableRow,
    pub geography_count: usize,
    pub period_count: usize,
    /// `GeographicTotal` values reported by the database, in query order.
    pub reported_geographic_totals: Vec<(String, f64)>,
    pub reported_grand_total: Option<f64>,
    pub warnings: Vec<DataQualityWarning>,
}

/// Period label, e.g. `quarter 1, 2019`.
pub fn period_label(time_level: &str, value: &str, year: Option<i32>) -> String {
    match year {
        Some(year) => format!("{time_level} {value}, {year}"),
        None => format!("{time_level} {value}"),
    }
}

/// Sort one axis for display. The axis orders numerically only when every
/// label on it is a number, otherwise lexicographically.
fn sort_axis<S: AsRef<str>>(labels: &mut [S]) {
    let numbers: Option<Vec<f64>> = labels
        .iter()
        .map(|l| l.as_ref().trim().parse::<f64>().ok())
        .collect();
    match numbers {
        Some(_) => labels.sort_by(|a, b| {
            let (a, b) = (a.as_ref(), b.as_ref());
            numeric_key(a)
                .total_cmp(&numeric_key(b))
                .then_with(|| a.cmp(b))
        }),
        None => labels.sort_by(|a, b| a.as_ref().cmp(b.as_ref())),
    }
}

fn numeric_key(label: &str) -> f64 {
    label.trim().parse().unwrap_or(f64::NAN)
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
}

fn check(warnings: &mut Vec<DataQualityWarning>, what: String, recomputed: f64, reported: f64) {
    if !approx_eq(recomputed, reported) {
        let warning = DataQualityWarning {
            check: what,
            recomputed,
            reported,
        };
        tracing::warn!(%warning, "cross table data quality");
        warnings.push(warning);
    }
}

/// Reshape cross-table query rows into a table of `measure`.
///
/// Returns `None` when the result has no detail rows.
pub fn build_cross_table(
    rows: &[AggregatedRow],
    request: &AggregationRequest,
    measure: Measure,
) -> Option<CrossTable> {
    let details: Vec<&AggregatedRow> = rows
        .iter()
        .filter(|r| classify_cross_table(r.rollup) == CrossTableLevel::Detail)
        .collect();
    if details.is_empty() {
        return None;
    }

    let mut columns: Vec<String> = details
        .iter()
        .filter_map(|r| r.product.as_value())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    sort_axis(&mut columns);
    let column_index: HashMap<&str, usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    // Pivot: geography -> period -> cells, zero filled.
    let mut pivot: HashMap<&str, HashMap<&str, Vec<f64>>> = HashMap::new();
    for row in &details {
        let (Some(geo), Some(time), Some(product)) = (
            row.geo.as_value(),
            row.time.as_value(),
            row.product.as_value(),
        ) else {
            continue;
        };
        let cells = pivot
            .entry(geo)
            .or_default()
            .entry(time)
            .or_insert_with(|| vec![0.0; columns.len()]);
        cells[column_index[product]] += measure.value(row);
    }

    let mut geographies: Vec<&str> = pivot.keys().copied().collect();
    sort_axis(&mut geographies);
    let period_count = pivot
        .values()
        .flat_map(|periods| periods.keys().copied())
        .collect::<BTreeSet<_>>()
        .len();

    let mut table_rows = Vec::new();
    let mut region_subtotals = Vec::new();
    let mut column_totals = vec![0.0; columns.len()];
    for geo in &geographies {
        let periods = &pivot[geo];
        let mut times: Vec<&str> = periods.keys().copied().collect();
        sort_axis(&mut times);

        let mut subtotal = vec![0.0; columns.len()];
        for time in times {
            let cells = periods[time].clone();
            for (i, value) in cells.iter().enumerate() {
                subtotal[i] += value;
                column_totals[i] += value;
            }
            table_rows.push(CrossTableRow::new(
                RowKind::Detail,
                geo.to_string(),
                period_label(&request.time, time, request.year),
                cells,
            ));
        }
        let subtotal_row = CrossTableRow::new(
            RowKind::RegionSubtotal,
            geo.to_string(),
            TOTAL_LABEL.to_string(),
            subtotal,
        );
        region_subtotals.push(subtotal_row.clone());
        table_rows.push(subtotal_row);
    }

    let mut grand_cells = vec![0.0; columns.len()];
    for subtotal in &region_subtotals {
        for (i, value) in subtotal.cells.iter().enumerate() {
            grand_cells[i] += value;
        }
    }
    let grand_total = CrossTableRow::new(
        RowKind::GrandTotal,
        TOTAL_LABEL.to_string(),
        String::new(),
        grand_cells,
    );

    let mut warnings = Vec::new();
    for (i, column) in columns.iter().enumerate() {
        check(
            &mut warnings,
            format!("column total for {column}"),
            grand_total.cells[i],
            column_totals[i],
        );
    }
    let sum_of_row_totals: f64 = table_rows
        .iter()
        .filter(|r| r.kind == RowKind::Detail)
        .map(|r| r.total)
        .sum();
    check(
        &mut warnings,
        "grand total against row totals".to_string(),
        grand_total.total,
        sum_of_row_totals,
    );
    check(
        &mut warnings,
        "grand total against column totals".to_string(),
        grand_total.total,
        column_totals.iter().sum(),
    );

    let mut reported_geographic_totals = Vec::new();
    let mut reported_grand_total = None;
    for row in rows {
        match classify_cross_table(row.rollup) {
            CrossTableLevel::GrandTotal => {
                let reported = measure.value(row);
                reported_grand_total = Some(reported);
                check(
                    &mut warnings,
                    "grand total against reported grand total".to_string(),
                    grand_total.total,
                    reported,
                );
            }
            CrossTableLevel::GeographicTotal => {
                let Some(geo) = row.geo.as_value() else { continue };
                let reported = measure.value(row);
                reported_geographic_totals.push((geo.to_string(), reported));
                if let Some(subtotal) = region_subtotals.iter().find(|s| s.geo == geo) {
                    check(
                        &mut warnings,
                        format!("geographic total for {geo}"),
                        subtotal.total,
                        reported,
                    );
                }
            }
            CrossTableLevel::RowSubtotal => {
                let (Some(geo), Some(time)) = (row.geo.as_value(), row.time.as_value()) else {
                    continue;
                };
                if let Some(cells) = pivot.get(geo).and_then(|p| p.get(time)) {
                    check(
                        &mut warnings,
                        format!("row subtotal for {geo} / {time}"),
                        cells.iter().sum(),
                        measure.value(row),
                    );
                }
            }
            CrossTableLevel::ColumnSubtotal => {
                let (Some(geo), Some(product)) = (row.geo.as_value(), row.product.as_value())
                else {
                    continue;
                };
                let subtotal = region_subtotals.iter().find(|s| s.geo == geo);
                if let (Some(subtotal), Some(&i)) = (subtotal, column_index.get(product)) {
                    check(
                        &mut warnings,
                        format!("column subtotal for {geo} / {product}"),
                        subtotal.cells[i],
                        measure.value(row),
                    );
                }
            }
            CrossTableLevel::Detail | CrossTableLevel::Unknown => {}
        }
    }

    Some(CrossTable {
        measure,
        geo_level: request.geo.clone(),
        time_level: request.time.clone(),
        product_level: request.product.clone(),
        year: request.year,
        columns,
        rows: table_rows,
        column_totals,
        grand_total,
        geography_count: geographies.len(),
        period_count,
        reported_geographic_totals,
        reported_grand_total,
        warnings,
    })
}

impl CrossTable {
    pub fn detail_rows(&self) -> impl Iterator<Item = &CrossTableRow> {
        self.rows.iter().filter(|r| r.kind == RowKind::Detail)
    }

    pub fn region_subtotals(&self) -> impl Iterator<Item = &CrossTableRow> {
        self.rows.iter().filter(|r| r.kind == RowKind::RegionSubtotal)
    }

    /// Cell lookup by geography, rendered period label and product.
    pub fn cell(&self, geo: &str, period: &str, product: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == product)?;
        self.rows
            .iter()
            .find(|r| r.kind == RowKind::Detail && r.geo == geo && r.period == period)
            .map(|r| r.cells[col])
    }

    /// Re-derive every total from the detail rows and list any disagreement.
    ///
    /// An empty result means the row, column and grand-total invariants hold.
    pub fn verify(&self) -> Vec<DataQualityWarning> {
        let mut problems = Vec::new();
        let mut column_sums = vec![0.0; self.columns.len()];
        for row in &self.rows {
            check(
                &mut problems,
                format!("row total for {} / {}", row.geo, row.period),
                row.cells.iter().sum(),
                row.total,
            );
            if row.kind == RowKind::Detail {
                for (i, value) in row.cells.iter().enumerate() {
                    column_sums[i] += value;
                }
            }
        }
        for subtotal in self.region_subtotals() {
            for (i, column) in self.columns.iter().enumerate() {
                let expected: f64 = self
                    .detail_rows()
                    .filter(|r| r.geo == subtotal.geo)
                    .map(|r| r.cells[i])
                    .sum();
                check(
                    &mut problems,
                    format!("region subtotal for {} / {column}", subtotal.geo),
                    expected,
                    subtotal.cells[i],
                );
            }
        }
        for (i, column) in self.columns.iter().enumerate() {
            check(
                &mut problems,
                format!("grand total for {column}"),
                column_sums[i],
                self.grand_total.cells[i],
            );
        }
        let sum_of_row_totals: f64 = self.detail_rows().map(|r| r.total).sum();
        check(
            &mut problems,
            "grand total".to_string(),
            sum_of_row_totals,
            self.grand_total.total,
        );
        check(
            &mut problems,
            "grand total against column totals".to_string(),
            column_sums.iter().sum(),
            self.grand_total.total,
        );
        problems
    }
}
