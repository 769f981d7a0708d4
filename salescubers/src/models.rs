use std::fmt;

use serde::{Deserialize, Serialize};

use crate::classify::{classify, AggregationLevel, RollupMask};
use crate::error::Result;
use crate::hierarchy::{self, Dimension, FieldRef};

/// Granularity chosen along each hierarchy plus an optional year filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationRequest {
    pub geo: String,
    pub time: String,
    pub product: String,
    #[serde(default)]
    pub year: Option<i32>,
}

impl AggregationRequest {
    pub fn new(
        geo: impl Into<String>,
        time: impl Into<String>,
        product: impl Into<String>,
        year: Option<i32>,
    ) -> Self {
        Self {
            geo: geo.into(),
            time: time.into(),
            product: product.into(),
            year,
        }
    }

    pub fn level(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Geographic => &self.geo,
            Dimension::Temporal => &self.time,
            Dimension::Product => &self.product,
        }
    }

    /// Check every level against its hierarchy and resolve backing fields.
    pub fn resolve(&self) -> Result<ResolvedRequest> {
        Ok(ResolvedRequest {
            geo: hierarchy::field(Dimension::Geographic, &self.geo)?,
            time: hierarchy::field(Dimension::Temporal, &self.time)?,
            product: hierarchy::field(Dimension::Product, &self.product)?,
            year: self.year,
        })
    }
}

impl Default for AggregationRequest {
    fn default() -> Self {
        Self::new("region", "quarter", "productGroup", None)
    }
}

/// A request whose levels have been validated against the hierarchies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub geo: FieldRef,
    pub time: FieldRef,
    pub product: FieldRef,
    pub year: Option<i32>,
}

impl ResolvedRequest {
    pub fn field(&self, dimension: Dimension) -> FieldRef {
        match dimension {
            Dimension::Geographic => self.geo,
            Dimension::Temporal => self.time,
            Dimension::Product => self.product,
        }
    }
}

/// Which grouping sets a query materializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationShape {
    /// Full power set of the three dimensions.
    Cube,
    /// The five sets a geography × time by product table needs.
    CrossTable,
}

/// Numeric measure shown in cross-table cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    TotalQuantity,
    TotalRevenue,
    TransactionCount,
}

impl Measure {
    pub fn column(self) -> &'static str {
        match self {
            Measure::TotalQuantity => "total_quantity",
            Measure::TotalRevenue => "total_revenue",
            Measure::TransactionCount => "transaction_count",
        }
    }

    /// Integral measures render without decimals.
    pub fn is_integral(self) -> bool {
        !matches!(self, Measure::TotalRevenue)
    }

    pub fn value(self, row: &AggregatedRow) -> f64 {
        match self {
            Measure::TotalQuantity => row.total_quantity as f64,
            Measure::TotalRevenue => row.total_revenue,
            Measure::TransactionCount => row.transaction_count as f64,
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Either a concrete level value or the rolled-up sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DimensionValue {
    Value(String),
    Total,
}

impl DimensionValue {
    pub const TOTAL_LABEL: &'static str = "[Total]";
    /// Shown for a grouped level whose stored value is NULL.
    pub const NULL_LABEL: &'static str = "(null)";

    pub fn as_value(&self) -> Option<&str> {
        match self {
            DimensionValue::Value(v) => Some(v),
            DimensionValue::Total => None,
        }
    }

    pub fn is_total(&self) -> bool {
        matches!(self, DimensionValue::Total)
    }
}

impl fmt::Display for DimensionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionValue::Value(v) => f.write_str(v),
            DimensionValue::Total => f.write_str(Self::TOTAL_LABEL),
        }
    }
}

/// One row of an aggregation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    pub geo: DimensionValue,
    pub time: DimensionValue,
    pub product: DimensionValue,
    pub total_quantity: i64,
    pub total_revenue: f64,
    pub transaction_count: i64,
    /// Average of revenue / quantity; `None` when every quantity was zero.
    pub avg_unit_price: Option<f64>,
    pub rollup: RollupMask,
    pub level: AggregationLevel,
}

impl AggregatedRow {
    pub fn new(
        geo: DimensionValue,
        time: DimensionValue,
        product: DimensionValue,
        total_quantity: i64,
        total_revenue: f64,
        transaction_count: i64,
        avg_unit_price: Option<f64>,
    ) -> Self {
        let rollup = RollupMask::new(geo.is_total(), time.is_total(), product.is_total());
        Self {
            geo,
            time,
            product,
            total_quantity,
            total_revenue,
            transaction_count,
            avg_unit_price,
            rollup,
            level: classify(rollup),
        }
    }

    pub fn value(&self, dimension: Dimension) -> &DimensionValue {
        match dimension {
            Dimension::Geographic => &self.geo,
            Dimension::Temporal => &self.time,
            Dimension::Product => &self.product,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Warehouse-wide figures; every field is `None` for an empty fact table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub total_revenue: Option<f64>,
    pub total_transactions: Option<i64>,
    pub date_range: Option<DateRange>,
    pub distinct_products: Option<i64>,
    pub distinct_shops: Option<i64>,
}

impl SummaryStatistics {
    pub fn is_empty(&self) -> bool {
        self.total_transactions.unwrap_or(0) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CubeError;

    #[test]
    fn resolve_rejects_unknown_level() {
        let request = AggregationRequest::new("region", "week", "productGroup", None);
        assert!(matches!(
            request.resolve(),
            Err(CubeError::InvalidGranularity(_))
        ));
    }

    #[test]
    fn request_deserializes_from_camel_case() {
        let request: AggregationRequest = serde_json::from_str(
            r#"{"geo": "city", "time": "month", "product": "article", "year": 2020}"#,
        )
        .unwrap();
        assert_eq!(request.level(Dimension::Geographic), "city");
        assert_eq!(request.year, Some(2020));
        let resolved = request.resolve().unwrap();
        assert_eq!(resolved.product.column, "articlename");
    }

    #[test]
    fn row_tag_follows_total_sentinels() {
        let row = AggregatedRow::new(
            DimensionValue::Value("North".into()),
            DimensionValue::Total,
            DimensionValue::Total,
            3,
            30.0,
            2,
            Some(10.0),
        );
        assert_eq!(row.rollup, RollupMask::new(false, true, true));
        assert_eq!(row.level, AggregationLevel::GeoOnly);
        assert_eq!(row.time.to_string(), "[Total]");
    }
}
