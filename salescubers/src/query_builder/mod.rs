use crate::dialect::Dialect;
use crate::error::Result;
use crate::executor::QueryParam;
use crate::models::{AggregationRequest, AggregationShape};
use crate::sql_ast::SqlRenderer;

pub mod grouping;
mod planner;

pub use planner::SummaryQuery;

/// Output column names shared by the builder and the row decoder.
pub mod columns {
    use crate::hierarchy::Dimension;

    pub const GEO_DIMENSION: &str = "geo_dimension";
    pub const TIME_DIMENSION: &str = "time_dimension";
    pub const PRODUCT_DIMENSION: &str = "product_dimension";
    pub const GEO_GROUPING: &str = "geo_grouping";
    pub const TIME_GROUPING: &str = "time_grouping";
    pub const PRODUCT_GROUPING: &str = "product_grouping";
    pub const TOTAL_QUANTITY: &str = "total_quantity";
    pub const TOTAL_REVENUE: &str = "total_revenue";
    pub const TRANSACTION_COUNT: &str = "transaction_count";
    pub const AVG_UNIT_PRICE: &str = "avg_unit_price";
    pub const START_DATE: &str = "start_date";
    pub const END_DATE: &str = "end_date";
    pub const DISTINCT_COUNT: &str = "distinct_count";

    pub fn value_column(dimension: Dimension) -> &'static str {
        match dimension {
            Dimension::Geographic => GEO_DIMENSION,
            Dimension::Temporal => TIME_DIMENSION,
            Dimension::Product => PRODUCT_DIMENSION,
        }
    }

    pub fn grouping_column(dimension: Dimension) -> &'static str {
        match dimension {
            Dimension::Geographic => GEO_GROUPING,
            Dimension::Temporal => TIME_GROUPING,
            Dimension::Product => PRODUCT_GROUPING,
        }
    }
}

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<QueryParam>,
    pub shape: Option<AggregationShape>,
}

pub struct SqlBuilder;

impl Default for SqlBuilder {
    fn default() -> Self {
        Self
    }
}

impl SqlBuilder {
    /// Aggregate over every subset of the three chosen fields.
    pub fn build_cube_query(
        &self,
        request: &AggregationRequest,
        dialect: &dyn Dialect,
    ) -> Result<BuiltQuery> {
        self.build_aggregation(request, AggregationShape::Cube, dialect)
    }

    /// Aggregate over the five subsets a cross table needs.
    pub fn build_cross_table_query(
        &self,
        request: &AggregationRequest,
        dialect: &dyn Dialect,
    ) -> Result<BuiltQuery> {
        self.build_aggregation(request, AggregationShape::CrossTable, dialect)
    }

    pub fn build_aggregation(
        &self,
        request: &AggregationRequest,
        shape: AggregationShape,
        dialect: &dyn Dialect,
    ) -> Result<BuiltQuery> {
        // Level validation happens before any SQL is produced.
        let resolved = request.resolve()?;
        let query = planner::build_aggregation_query(&resolved, shape);
        let sql = SqlRenderer::new(dialect).render_select(&query);
        tracing::debug!(
            geo = %request.geo,
            time = %request.time,
            product = %request.product,
            year = ?request.year,
            ?shape,
            "built aggregation query"
        );
        Ok(BuiltQuery {
            sql,
            params: resolved.year.map(QueryParam::Int).into_iter().collect(),
            shape: Some(shape),
        })
    }

    pub fn build_summary_query(&self, which: SummaryQuery, dialect: &dyn Dialect) -> BuiltQuery {
        BuiltQuery {
            sql: SqlRenderer::new(dialect).render_select(&which.build()),
            params: Vec::new(),
            shape: None,
        }
    }
}
