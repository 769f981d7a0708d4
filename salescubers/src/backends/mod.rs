//! Database backend implementations.
//!
//! Each backend is implemented in its own file and gated behind a feature flag.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{BackendKind, WarehouseConfig};
use crate::dialect::Dialect;
use crate::error::{CubeError, Result};
use crate::executor::{QueryParam, QueryResult};

/// Unified interface to the warehouse store.
#[async_trait]
pub trait BackendConnection: Send + Sync {
    fn dialect(&self) -> &(dyn Dialect + Send + Sync);

    /// Execute read-only SQL with positional parameters.
    ///
    /// Connection loss and malformed SQL surface as `CubeError::Storage`.
    async fn execute_sql(&self, sql: &str, params: &[QueryParam]) -> Result<QueryResult>;
}

/// Open the backend selected by the warehouse configuration.
pub fn connect(config: &WarehouseConfig) -> Result<Arc<dyn BackendConnection>> {
    tracing::info!(backend = ?config.backend, "connecting to warehouse");
    match config.backend {
        #[cfg(feature = "duckdb")]
        BackendKind::DuckDb => Ok(Arc::new(
            DuckDbConnection::new(&config.duckdb.path)
                .with_max_concurrency(config.duckdb.max_concurrency),
        )),
        #[cfg(feature = "postgres")]
        BackendKind::Postgres => Ok(Arc::new(PostgresConnection::from_config(&config.postgres)?)),
        #[allow(unreachable_patterns)]
        other => Err(CubeError::Config(format!(
            "backend {other:?} is not enabled in this build"
        ))),
    }
}

// Feature-gated backend implementations
#[cfg(feature = "duckdb")]
mod duckdb;
#[cfg(feature = "duckdb")]
pub use duckdb::DuckDbConnection;

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "postgres")]
pub use postgres::PostgresConnection;
