//! SQL dialect abstractions for different database backends.
//!
//! Each dialect is implemented in its own file and gated behind a feature flag.

use crate::sql_ast::{Aggregation, Function, SqlType};

/// Dialects render identifiers and primitive expression pieces.
/// Expression tree walking lives in the renderer; the dialect
/// only maps logical constructs to SQL fragments.
pub trait Dialect {
    fn quote_ident(&self, ident: &str) -> String;
    fn qualify_table(&self, table: &str) -> String {
        self.quote_ident(table)
    }
    fn placeholder(&self, _idx: usize) -> String {
        "?".to_string()
    }
    fn render_type(&self, ty: SqlType) -> &'static str {
        match ty {
            SqlType::Text => "TEXT",
            SqlType::BigInt => "BIGINT",
            SqlType::Double => "DOUBLE PRECISION",
        }
    }
    fn render_function(&self, func: &Function, args: Vec<String>) -> String {
        match func {
            Function::Coalesce => format!("COALESCE({})", args.join(", ")),
            Function::NullIf => match args.as_slice() {
                [expr1, expr2] => format!("NULLIF({expr1}, {expr2})"),
                _ => "NULL".to_string(),
            },
            Function::Cast(ty) => match args.as_slice() {
                [expr] => format!("CAST({expr} AS {})", self.render_type(*ty)),
                _ => "NULL".to_string(),
            },
            Function::Grouping => format!("GROUPING({})", args.join(", ")),
        }
    }
    fn render_aggregation(&self, agg: &Aggregation, expr: &str) -> String {
        match agg {
            Aggregation::Sum => format!("SUM({expr})"),
            Aggregation::Count => format!("COUNT({expr})"),
            Aggregation::CountDistinct => format!("COUNT(DISTINCT {expr})"),
            Aggregation::Avg => format!("AVG({expr})"),
            Aggregation::Min => format!("MIN({expr})"),
            Aggregation::Max => format!("MAX({expr})"),
        }
    }
    fn render_literal(&self, value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::Null => "NULL".to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => format!("'{}'", s.replace('\'', "''")),
            other => format!("'{}'", other.to_string().replace('\'', "''")),
        }
    }
}

// Feature-gated dialect implementations
#[cfg(feature = "duckdb")]
mod duckdb;
#[cfg(feature = "duckdb")]
pub use duckdb::DuckDbDialect;

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "postgres")]
pub use postgres::PostgresDialect;
