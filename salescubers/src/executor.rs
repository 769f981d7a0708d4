#[cfg(feature = "duckdb")]
use duckdb::types::Value as DuckValue;
use serde_json::{Map, Value};

use crate::error::{CubeError, Result};
use crate::hierarchy::Dimension;
use crate::models::{AggregatedRow, DimensionValue};
use crate::query_builder::columns;

#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Map<String, Value>>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Positional query parameter. The only filter is the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryParam {
    Int(i32),
}

#[cfg(feature = "duckdb")]
impl From<&QueryParam> for DuckValue {
    fn from(param: &QueryParam) -> Self {
        match param {
            QueryParam::Int(v) => DuckValue::Int(*v),
        }
    }
}

#[cfg(feature = "duckdb")]
pub(crate) fn duck_value_to_json(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(i) => Value::from(i),
        DuckValue::SmallInt(i) => Value::from(i),
        DuckValue::Int(i) => Value::from(i),
        DuckValue::BigInt(i) => Value::from(i),
        DuckValue::HugeInt(i) => i64::try_from(i)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(i.to_string())),
        DuckValue::UTinyInt(i) => Value::from(i),
        DuckValue::USmallInt(i) => Value::from(i),
        DuckValue::UInt(i) => Value::from(i),
        DuckValue::UBigInt(i) => Value::from(i),
        DuckValue::Float(f) => Value::from(f),
        DuckValue::Double(f) => Value::from(f),
        DuckValue::Decimal(d) => Value::String(d.to_string()),
        DuckValue::Text(s) => Value::String(s),
        DuckValue::Blob(bytes) => Value::String(hex::encode(bytes)),
        DuckValue::Date32(d) => Value::from(d),
        DuckValue::Enum(s) => Value::String(s),
        other => Value::String(format!("{other:?}")),
    }
}

fn field<'a>(row: &'a Map<String, Value>, name: &str) -> Result<&'a Value> {
    row.get(name)
        .ok_or_else(|| CubeError::Decode(format!("missing column {name}")))
}

/// Numbers may arrive as JSON numbers or, for decimals, as strings.
pub(crate) fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

pub(crate) fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

pub(crate) fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn dimension_value(row: &Map<String, Value>, dimension: Dimension) -> Result<DimensionValue> {
    let flag = field(row, columns::grouping_column(dimension))?;
    let rolled_up = as_i64(flag).ok_or_else(|| {
        CubeError::Decode(format!(
            "non-numeric grouping flag for {}",
            dimension.name()
        ))
    })? != 0;
    if rolled_up {
        return Ok(DimensionValue::Total);
    }
    // Not rolled up, so the COALESCE fallback means the stored value was NULL.
    let value = as_text(field(row, columns::value_column(dimension))?)
        .filter(|v| v != DimensionValue::TOTAL_LABEL)
        .unwrap_or_else(|| DimensionValue::NULL_LABEL.to_string());
    Ok(DimensionValue::Value(value))
}

/// Decode aggregation rows into typed, classified records.
pub fn decode_aggregated_rows(result: &QueryResult) -> Result<Vec<AggregatedRow>> {
    result
        .rows
        .iter()
        .map(|row| {
            let quantity = as_i64(field(row, columns::TOTAL_QUANTITY)?).unwrap_or(0);
            let revenue = as_f64(field(row, columns::TOTAL_REVENUE)?).unwrap_or(0.0);
            let count = as_i64(field(row, columns::TRANSACTION_COUNT)?).ok_or_else(|| {
                CubeError::Decode(format!("non-numeric {}", columns::TRANSACTION_COUNT))
            })?;
            let avg = row.get(columns::AVG_UNIT_PRICE).and_then(as_f64);
            Ok(AggregatedRow::new(
                dimension_value(row, Dimension::Geographic)?,
                dimension_value(row, Dimension::Temporal)?,
                dimension_value(row, Dimension::Product)?,
                quantity,
                revenue,
                count,
                avg,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::classify::AggregationLevel;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn decodes_rolled_up_dimensions_from_grouping_flags() {
        let result = QueryResult {
            columns: vec![],
            rows: vec![row(json!({
                "geo_dimension": "North",
                "time_dimension": "[Total]",
                "product_dimension": "[Total]",
                "geo_grouping": 0,
                "time_grouping": 1,
                "product_grouping": 1,
                "total_quantity": 12,
                "total_revenue": "120.50",
                "transaction_count": 3,
                "avg_unit_price": null
            }))],
        };
        let rows = decode_aggregated_rows(&result).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].geo, DimensionValue::Value("North".into()));
        assert!(rows[0].time.is_total());
        assert_eq!(rows[0].level, AggregationLevel::GeoOnly);
        assert_eq!(rows[0].total_revenue, 120.5);
        assert_eq!(rows[0].avg_unit_price, None);
    }

    #[test]
    fn numeric_dimension_values_become_text() {
        let result = QueryResult {
            columns: vec![],
            rows: vec![row(json!({
                "geo_dimension": "North",
                "time_dimension": 3,
                "product_dimension": "Tea",
                "geo_grouping": 0,
                "time_grouping": 0,
                "product_grouping": 0,
                "total_quantity": 1,
                "total_revenue": 2.0,
                "transaction_count": 1,
                "avg_unit_price": 2.0
            }))],
        };
        let rows = decode_aggregated_rows(&result).unwrap();
        assert_eq!(rows[0].time, DimensionValue::Value("3".into()));
    }

    #[test]
    fn null_level_value_is_not_a_total() {
        let result = QueryResult {
            columns: vec![],
            rows: vec![row(json!({
                "geo_dimension": "[Total]",
                "time_dimension": "[Total]",
                "product_dimension": "Tea",
                "geo_grouping": 0,
                "time_grouping": 1,
                "product_grouping": 0,
                "total_quantity": 1,
                "total_revenue": 2.0,
                "transaction_count": 1,
                "avg_unit_price": 2.0
            }))],
        };
        let rows = decode_aggregated_rows(&result).unwrap();
        assert_eq!(rows[0].geo, DimensionValue::Value(DimensionValue::NULL_LABEL.into()));
        assert_eq!(rows[0].geo.to_string(), "(null)");
        assert!(rows[0].time.is_total());
        assert_eq!(rows[0].level, AggregationLevel::GeoAndProduct);
    }

    #[test]
    fn missing_grouping_column_is_decode_error() {
        let result = QueryResult {
            columns: vec![],
            rows: vec![row(json!({ "geo_dimension": "North" }))],
        };
        assert!(matches!(
            decode_aggregated_rows(&result),
            Err(CubeError::Decode(_))
        ));
    }
}
