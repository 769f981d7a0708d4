//! Query execution façade tying the builder, a backend and the reshapers together.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::backends::{self, BackendConnection};
use crate::classify::{classify, AggregationLevel, RollupMask};
use crate::config::{CubeConfig, DisplayConfig};
use crate::crosstab::{build_cross_table, CrossTable};
use crate::error::Result;
use crate::executor::{self, decode_aggregated_rows, QueryResult};
use crate::models::{
    AggregatedRow, AggregationRequest, AggregationShape, DateRange, Measure, SummaryStatistics,
};
use crate::query_builder::{columns, BuiltQuery, SqlBuilder, SummaryQuery};
use crate::render::{TextRenderer, NO_DATA};

/// All eight aggregation levels of one cube query.
#[derive(Debug, Clone, Serialize)]
pub struct CubeAnalysis {
    pub request: AggregationRequest,
    pub rows: Vec<AggregatedRow>,
    /// Row count per level, in classification table order.
    pub level_counts: Vec<(AggregationLevel, usize)>,
    pub summary: String,
}

impl CubeAnalysis {
    fn new(request: AggregationRequest, rows: Vec<AggregatedRow>) -> Self {
        let level_counts = RollupMask::all()
            .map(classify)
            .map(|level| (level, rows.iter().filter(|r| r.level == level).count()))
            .collect();
        Self {
            request,
            rows,
            level_counts,
            summary: String::new(),
        }
    }

    pub fn rows_at(&self, level: AggregationLevel) -> impl Iterator<Item = &AggregatedRow> {
        self.rows.iter().filter(move |r| r.level == level)
    }

    pub fn count_at(&self, level: AggregationLevel) -> usize {
        self.level_counts
            .iter()
            .find(|(l, _)| *l == level)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn grand_total(&self) -> Option<&AggregatedRow> {
        self.rows_at(AggregationLevel::GrandTotal).next()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CrossTableReport {
    /// `None` when the request matched no detail rows.
    pub table: Option<CrossTable>,
    pub text: String,
}

pub struct OlapAnalyzer {
    connection: Arc<dyn BackendConnection>,
    builder: SqlBuilder,
    renderer: TextRenderer,
}

impl OlapAnalyzer {
    pub fn new(connection: Arc<dyn BackendConnection>) -> Self {
        Self {
            connection,
            builder: SqlBuilder::default(),
            renderer: TextRenderer::default(),
        }
    }

    pub fn with_display(mut self, display: DisplayConfig) -> Self {
        self.renderer = TextRenderer::new(display);
        self
    }

    /// Connect to the configured warehouse.
    pub fn from_config(config: &CubeConfig) -> Result<Self> {
        let connection = backends::connect(&config.warehouse)?;
        Ok(Self::new(connection).with_display(config.display.clone()))
    }

    pub fn renderer(&self) -> &TextRenderer {
        &self.renderer
    }

    async fn execute(&self, query: &BuiltQuery) -> Result<QueryResult> {
        self.connection.execute_sql(&query.sql, &query.params).await
    }

    async fn fetch_rows(
        &self,
        request: &AggregationRequest,
        shape: AggregationShape,
    ) -> Result<Vec<AggregatedRow>> {
        // Granularity errors reach the caller; storage failures do not.
        let query = self
            .builder
            .build_aggregation(request, shape, self.connection.dialect())?;
        let outcome = self
            .execute(&query)
            .await
            .and_then(|result| decode_aggregated_rows(&result));
        match outcome {
            Ok(mut rows) => {
                // An empty fact set still yields one row for the `()` set.
                rows.retain(|r| r.transaction_count > 0);
                Ok(rows)
            }
            Err(e) if e.is_storage() => {
                tracing::warn!(error = %e, ?shape, "aggregation query failed, returning no rows");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Run the cube query and summarize the rows per aggregation level.
    pub async fn run_cube_analysis(&self, request: &AggregationRequest) -> Result<CubeAnalysis> {
        let rows = self.fetch_rows(request, AggregationShape::Cube).await?;
        let mut analysis = CubeAnalysis::new(request.clone(), rows);
        analysis.summary = self.renderer.cube_summary(&analysis);
        tracing::info!(
            geo = %request.geo,
            time = %request.time,
            product = %request.product,
            year = ?request.year,
            rows = analysis.rows.len(),
            "cube analysis complete"
        );
        Ok(analysis)
    }

    /// Run the cross-table query and reshape it into a geography × time by product table.
    pub async fn run_cross_table(
        &self,
        request: &AggregationRequest,
        measure: Measure,
    ) -> Result<CrossTableReport> {
        let rows = self.fetch_rows(request, AggregationShape::CrossTable).await?;
        let table = build_cross_table(&rows, request, measure);
        let text = match &table {
            Some(table) => self.renderer.cross_table(table),
            None => format!("Cross table: {NO_DATA}\n"),
        };
        tracing::info!(
            %measure,
            source_rows = rows.len(),
            table_rows = table.as_ref().map(|t| t.rows.len()).unwrap_or(0),
            warnings = table.as_ref().map(|t| t.warnings.len()).unwrap_or(0),
            "cross table complete"
        );
        Ok(CrossTableReport { table, text })
    }

    async fn summary_row(&self, which: SummaryQuery) -> Option<Map<String, Value>> {
        let query = self
            .builder
            .build_summary_query(which, self.connection.dialect());
        match self.execute(&query).await {
            Ok(result) => result.rows.into_iter().next(),
            Err(e) => {
                tracing::warn!(query = which.name(), error = %e, "summary query failed");
                None
            }
        }
    }

    /// Warehouse-wide figures. Each figure is fetched separately and a failed
    /// query leaves only its own field empty.
    pub async fn summary_statistics(&self) -> SummaryStatistics {
        let mut stats = SummaryStatistics::default();
        for which in SummaryQuery::ALL {
            let Some(row) = self.summary_row(which).await else {
                continue;
            };
            let get = |name: &str| row.get(name);
            match which {
                SummaryQuery::TotalRevenue => {
                    stats.total_revenue = get(columns::TOTAL_REVENUE).and_then(executor::as_f64);
                }
                SummaryQuery::TotalTransactions => {
                    stats.total_transactions =
                        get(columns::TRANSACTION_COUNT).and_then(executor::as_i64);
                }
                SummaryQuery::DateRange => {
                    let start = get(columns::START_DATE).and_then(executor::as_text);
                    let end = get(columns::END_DATE).and_then(executor::as_text);
                    if let (Some(start), Some(end)) = (start, end) {
                        stats.date_range = Some(DateRange { start, end });
                    }
                }
                SummaryQuery::DistinctProducts => {
                    stats.distinct_products =
                        get(columns::DISTINCT_COUNT).and_then(executor::as_i64);
                }
                SummaryQuery::DistinctShops => {
                    stats.distinct_shops = get(columns::DISTINCT_COUNT).and_then(executor::as_i64);
                }
            }
        }
        if stats.total_transactions == Some(0) {
            return SummaryStatistics::default();
        }
        tracing::info!(
            transactions = ?stats.total_transactions,
            products = ?stats.distinct_products,
            shops = ?stats.distinct_shops,
            "summary statistics collected"
        );
        stats
    }
}
