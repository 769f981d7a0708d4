//! Plain-text rendering of analysis results.

use std::fmt::Write as _;

use crate::analyzer::CubeAnalysis;
use crate::config::DisplayConfig;
use crate::crosstab::{CrossTable, CrossTableRow};
use crate::models::{AggregatedRow, Measure, SummaryStatistics};

/// Printed in place of a table when the Detail subset is empty.
pub const NO_DATA: &str = "no data";

const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Default)]
pub struct TextRenderer {
    display: DisplayConfig,
}

enum Align {
    Left,
    Right,
}

/// Insert `,` every three integer digits.
pub fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };
    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    if value < 0.0 && grouped.chars().any(|c| c.is_ascii_digit() && c != '0') {
        grouped.insert(0, '-');
    }
    grouped
}

fn format_measure(measure: Measure, value: f64) -> String {
    if measure.is_integral() {
        group_thousands(value, 0)
    } else {
        group_thousands(value, 2)
    }
}

fn format_table(headers: &[String], rows: &[Vec<String>], aligns: &[Align]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        let parts: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| match aligns.get(i).unwrap_or(&Align::Left) {
                Align::Left => format!("{:<width$}", cell, width = widths[i]),
                Align::Right => format!("{:>width$}", cell, width = widths[i]),
            })
            .collect();
        parts.join(" | ").trim_end().to_string()
    };

    let mut out = String::new();
    out.push_str(&line(headers));
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');
    for row in rows {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}

impl TextRenderer {
    pub fn new(display: DisplayConfig) -> Self {
        Self { display }
    }

    pub fn display(&self) -> &DisplayConfig {
        &self.display
    }

    /// Shorten `text` to the configured cell width.
    fn fit(&self, text: &str) -> String {
        let width = self.display.max_cell_width.max(ELLIPSIS.len() + 1);
        if text.chars().count() <= width {
            return text.to_string();
        }
        let kept: String = text.chars().take(width - ELLIPSIS.len()).collect();
        format!("{kept}{ELLIPSIS}")
    }

    pub fn cube_summary(&self, analysis: &CubeAnalysis) -> String {
        let request = &analysis.request;
        let mut out = String::new();
        let _ = writeln!(out, "OLAP analysis (all aggregation levels)");
        let _ = writeln!(out, "Geographic granularity: {}", request.geo);
        let _ = writeln!(out, "Time granularity: {}", request.time);
        let _ = writeln!(out, "Product granularity: {}", request.product);
        if let Some(year) = request.year {
            let _ = writeln!(out, "Year filter: {year}");
        }
        let _ = writeln!(out, "Total records: {}", analysis.rows.len());
        if analysis.rows.is_empty() {
            let _ = writeln!(out, "{NO_DATA}");
            return out;
        }
        let _ = writeln!(out, "Aggregation levels:");
        for (level, count) in &analysis.level_counts {
            if *count > 0 {
                let _ = writeln!(out, "  - {level}: {count} records");
            }
        }
        out
    }

    /// Tabulate aggregated rows, at most `limit` of them.
    pub fn rows(&self, rows: &[AggregatedRow], limit: usize) -> String {
        let headers: Vec<String> = [
            "geo",
            "time",
            "product",
            "total_quantity",
            "total_revenue",
            "transaction_count",
            "avg_unit_price",
            "level",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect();
        let body: Vec<Vec<String>> = rows
            .iter()
            .take(limit)
            .map(|row| {
                vec![
                    self.fit(&row.geo.to_string()),
                    self.fit(&row.time.to_string()),
                    self.fit(&row.product.to_string()),
                    group_thousands(row.total_quantity as f64, 0),
                    group_thousands(row.total_revenue, 2),
                    group_thousands(row.transaction_count as f64, 0),
                    row.avg_unit_price
                        .map(|p| group_thousands(p, 2))
                        .unwrap_or_default(),
                    row.level.to_string(),
                ]
            })
            .collect();
        let aligns = [
            Align::Left,
            Align::Left,
            Align::Left,
            Align::Right,
            Align::Right,
            Align::Right,
            Align::Right,
            Align::Left,
        ];
        format_table(&headers, &body, &aligns)
    }

    /// Render the pivot with the product columns capped at `max_product_columns`.
    ///
    /// Hidden columns collapse into a single `...` column; the Total column
    /// always covers every product.
    pub fn cross_table(&self, table: &CrossTable) -> String {
        let cap = self.display.max_product_columns.max(1);
        let shown = table.columns.len().min(cap);
        let truncated = table.columns.len() > cap;

        let mut headers = vec![table.geo_level.clone(), table.time_level.clone()];
        headers.extend(table.columns[..shown].iter().map(|c| self.fit(c)));
        if truncated {
            headers.push(ELLIPSIS.to_string());
        }
        headers.push("Total".to_string());

        let row_cells = |row: &CrossTableRow| -> Vec<String> {
            let mut cells = vec![self.fit(&row.geo), row.period.clone()];
            cells.extend(
                row.cells[..shown]
                    .iter()
                    .map(|v| format_measure(table.measure, *v)),
            );
            if truncated {
                cells.push(ELLIPSIS.to_string());
            }
            cells.push(format_measure(table.measure, row.total));
            cells
        };

        let mut body: Vec<Vec<String>> = table.rows.iter().map(&row_cells).collect();
        body.push(row_cells(&table.grand_total));

        let mut aligns = vec![Align::Left, Align::Left];
        aligns.extend((0..headers.len() - 2).map(|_| Align::Right));

        let mut out = String::new();
        let _ = writeln!(out, "Cross table");
        let _ = writeln!(
            out,
            "Rows: {} + {} (multi-level), Columns: {}",
            table.geo_level, table.time_level, table.product_level
        );
        match table.year {
            Some(year) => {
                let _ = writeln!(out, "Metric: {}, Year: {year}", table.measure);
            }
            None => {
                let _ = writeln!(out, "Metric: {}", table.measure);
            }
        }
        out.push('\n');
        out.push_str(&format_table(&headers, &body, &aligns));
        if truncated {
            let _ = writeln!(
                out,
                "({} of {} product columns shown)",
                shown,
                table.columns.len()
            );
        }
        out.push('\n');
        out.push_str(&self.table_summary(table));
        out
    }

    /// Table summary plus insights from the database's own subtotal rows.
    pub fn table_summary(&self, table: &CrossTable) -> String {
        let row_count = table.rows.len() + 1;
        let column_count = table.columns.len() + 3;
        let mut out = String::new();
        let _ = writeln!(out, "Table summary:");
        let _ = writeln!(out, "  Geographic regions: {}", table.geography_count);
        let _ = writeln!(out, "  Time periods: {}", table.period_count);
        let _ = writeln!(out, "  Product columns: {}", table.columns.len());
        let _ = writeln!(
            out,
            "  Total table size: {row_count} rows x {column_count} columns"
        );

        if !table.reported_geographic_totals.is_empty() || table.reported_grand_total.is_some() {
            let _ = writeln!(out, "Additional insights:");
            if !table.reported_geographic_totals.is_empty() {
                let _ = writeln!(out, "  Geographic totals:");
                for (geo, value) in table.reported_geographic_totals.iter().take(3) {
                    let _ = writeln!(out, "    {geo}: {}", group_thousands(*value, 0));
                }
            }
            if let Some(total) = table.reported_grand_total {
                let _ = writeln!(
                    out,
                    "  Grand total {}: {}",
                    table.measure,
                    group_thousands(total, 0)
                );
            }
        }

        if !table.warnings.is_empty() {
            let _ = writeln!(out, "Data quality warnings:");
            for warning in &table.warnings {
                let _ = writeln!(out, "  {warning}");
            }
        }
        out
    }

    pub fn summary_statistics(&self, stats: &SummaryStatistics) -> String {
        if stats.is_empty() {
            return format!("Warehouse summary: {NO_DATA}\n");
        }
        let unknown = || "n/a".to_string();
        let mut out = String::new();
        let _ = writeln!(out, "Warehouse summary:");
        let _ = writeln!(
            out,
            "  Total transactions: {}",
            stats
                .total_transactions
                .map(|v| group_thousands(v as f64, 0))
                .unwrap_or_else(unknown)
        );
        let _ = writeln!(
            out,
            "  Total revenue: {}",
            stats
                .total_revenue
                .map(|v| group_thousands(v, 2))
                .unwrap_or_else(unknown)
        );
        let _ = writeln!(
            out,
            "  Product varieties: {}",
            stats
                .distinct_products
                .map(|v| v.to_string())
                .unwrap_or_else(unknown)
        );
        let _ = writeln!(
            out,
            "  Number of shops: {}",
            stats
                .distinct_shops
                .map(|v| v.to_string())
                .unwrap_or_else(unknown)
        );
        let _ = writeln!(
            out,
            "  Date range: {}",
            stats
                .date_range
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_else(unknown)
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(group_thousands(0.0, 0), "0");
        assert_eq!(group_thousands(999.0, 0), "999");
        assert_eq!(group_thousands(1234567.891, 2), "1,234,567.89");
        assert_eq!(group_thousands(-1500.0, 0), "-1,500");
        assert_eq!(group_thousands(-0.001, 2), "0.00");
    }

    #[test]
    fn long_labels_are_shortened_to_cell_width() {
        let renderer = TextRenderer::new(DisplayConfig {
            max_cell_width: 8,
            ..DisplayConfig::default()
        });
        assert_eq!(renderer.fit("Beverages"), "Bever...");
        assert_eq!(renderer.fit("Tea"), "Tea");
    }

    #[test]
    fn empty_warehouse_summary_says_no_data() {
        let renderer = TextRenderer::default();
        let text = renderer.summary_statistics(&SummaryStatistics::default());
        assert!(text.contains(NO_DATA));
    }
}
