//! DuckDB backend implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::{Mutex, Semaphore};

use crate::dialect::DuckDbDialect;
use crate::error::{CubeError, Result};
use crate::executor::{duck_value_to_json, ColumnMeta, QueryParam, QueryResult};

use super::BackendConnection;

const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Embedded DuckDB warehouse.
///
/// Queries run on the blocking thread pool. Opened connections are kept in
/// an idle list and reused; the semaphore bounds how many run at once.
#[derive(Clone)]
pub struct DuckDbConnection {
    database_path: PathBuf,
    dialect: DuckDbDialect,
    limiter: Arc<Semaphore>,
    idle: Arc<Mutex<Vec<duckdb::Connection>>>,
}

impl DuckDbConnection {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let database_path = path.as_ref().to_path_buf();
        tracing::info!(path = %database_path.display(), "using DuckDB warehouse");
        Self {
            database_path,
            dialect: DuckDbDialect,
            limiter: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENCY)),
            idle: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Bound the number of queries in flight (at least one).
    pub fn with_max_concurrency(mut self, max_in_flight: usize) -> Self {
        self.limiter = Arc::new(Semaphore::new(max_in_flight.max(1)));
        self
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    async fn checkout(&self) -> Result<duckdb::Connection> {
        if let Some(conn) = self.idle.lock().await.pop() {
            return Ok(conn);
        }
        tracing::debug!(path = %self.database_path.display(), "opening DuckDB connection");
        duckdb::Connection::open(&self.database_path)
            .map_err(|e| CubeError::Storage(format!("open duckdb: {e}")))
    }

    async fn checkin(&self, conn: duckdb::Connection) {
        self.idle.lock().await.push(conn);
    }
}

/// Run one statement and collect every row as a JSON object.
fn run_statement(
    conn: &duckdb::Connection,
    sql: &str,
    params: Vec<duckdb::types::Value>,
) -> Result<QueryResult> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows_iter = stmt.query(duckdb::params_from_iter(params))?;
    let names: Vec<String> = {
        let described = rows_iter
            .as_ref()
            .ok_or_else(|| CubeError::Storage("statement missing".to_string()))?;
        (0..described.column_count())
            .map(|idx| {
                described
                    .column_name(idx)
                    .map(|name| name.to_string())
                    .map_err(|e| CubeError::Storage(e.to_string()))
            })
            .collect::<Result<_>>()?
    };

    let mut rows = Vec::new();
    while let Some(row) = rows_iter.next()? {
        let mut map = serde_json::Map::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            map.insert(name.clone(), duck_value_to_json(row.get_ref(idx)?.to_owned()));
        }
        rows.push(map);
    }
    let columns = names.into_iter().map(|name| ColumnMeta { name }).collect();
    Ok(QueryResult { columns, rows })
}

#[async_trait]
impl BackendConnection for DuckDbConnection {
    fn dialect(&self) -> &(dyn crate::dialect::Dialect + Send + Sync) {
        &self.dialect
    }

    async fn execute_sql(&self, sql: &str, params: &[QueryParam]) -> Result<QueryResult> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| CubeError::Storage(format!("limiter closed: {e}")))?;
        let conn = self.checkout().await?;
        let sql = sql.to_string();
        let bound: Vec<duckdb::types::Value> = params.iter().map(Into::into).collect();

        let (outcome, conn) = tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let outcome = run_statement(&conn, &sql, bound);
            if let Ok(result) = &outcome {
                tracing::debug!(
                    rows = result.rows.len(),
                    ms = start.elapsed().as_millis(),
                    "duckdb execute_sql"
                );
            }
            (outcome, conn)
        })
        .await
        .map_err(|e| CubeError::Storage(format!("task join error: {e}")))?;

        // A failed statement leaves the connection usable.
        self.checkin(conn).await;
        outcome
    }
}
