//! DuckDB dialect implementation.

use crate::sql_ast::SqlType;

use super::Dialect;

#[derive(Debug, Default, Clone, Copy)]
pub struct DuckDbDialect;

impl Dialect for DuckDbDialect {
    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn render_type(&self, ty: SqlType) -> &'static str {
        match ty {
            SqlType::Text => "VARCHAR",
            SqlType::BigInt => "BIGINT",
            SqlType::Double => "DOUBLE",
        }
    }
}
