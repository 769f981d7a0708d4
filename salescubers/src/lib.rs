pub mod analyzer;
pub mod backends;
pub mod classify;
pub mod config;
pub mod crosstab;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod hierarchy;
pub mod logging;
pub mod models;
pub mod navigator;
pub mod query_builder;
pub mod render;
pub mod sql_ast;

pub use analyzer::{CrossTableReport, CubeAnalysis, OlapAnalyzer};
pub use backends::BackendConnection;
pub use classify::{classify, classify_cross_table, AggregationLevel, CrossTableLevel, RollupMask};
pub use config::CubeConfig;
pub use crosstab::{build_cross_table, CrossTable, DataQualityWarning};
pub use error::{CubeError, Result};
pub use executor::{QueryParam, QueryResult};
pub use hierarchy::Dimension;
pub use models::{AggregatedRow, AggregationRequest, Measure, SummaryStatistics};
pub use navigator::{DrillNavigator, DrillSession, Transition};
pub use query_builder::SqlBuilder;
