//! Configuration system for salescube.
//!
//! Supports TOML-based configuration for the warehouse connection, text
//! rendering and the drill navigator's starting point.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CubeError, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CubeConfig {
    pub warehouse: WarehouseConfig,
    pub display: DisplayConfig,
    pub navigation: NavigationConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    #[serde(rename = "duckdb", alias = "duck_db")]
    DuckDb,
    Postgres,
}

/// Warehouse store connection settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub backend: BackendKind,
    pub duckdb: DuckDbConfig,
    pub postgres: PostgresConfig,
}

/// DuckDB-specific configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DuckDbConfig {
    /// Database file (default: `datawarehouse.duckdb`).
    pub path: PathBuf,
    /// Maximum concurrent queries (default: 4).
    pub max_concurrency: usize,
}

/// PostgreSQL-specific configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PostgresConfig {
    /// Key-value or URL connection string.
    pub connection_string: String,
    /// Schema holding the star schema tables (default: `public`).
    pub schema: String,
    /// Connection pool size (default: 4).
    pub pool_size: usize,
    /// Statement timeout in milliseconds (default: 30000).
    pub statement_timeout_ms: u64,
}

/// Text rendering settings, passed explicitly to the renderers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Product columns shown before the rest collapse into `...` (default: 8).
    pub max_product_columns: usize,
    /// Maximum characters per cell (default: 12).
    pub max_cell_width: usize,
    /// Sample rows printed for the current drill level (default: 10).
    pub sample_rows: usize,
}

/// Initial drill position and year filter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub geo_level: String,
    pub time_level: String,
    pub product_level: String,
    pub year: Option<i32>,
}

impl Default for DuckDbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("datawarehouse.duckdb"),
            max_concurrency: 4,
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            connection_string:
                "host=localhost port=5432 user=dwuser password=dwpassword dbname=datawarehouse"
                    .to_string(),
            schema: "public".to_string(),
            pool_size: 4,
            statement_timeout_ms: 30_000,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_product_columns: 8,
            max_cell_width: 12,
            sample_rows: 10,
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            geo_level: "region".to_string(),
            time_level: "quarter".to_string(),
            product_level: "productGroup".to_string(),
            year: Some(2019),
        }
    }
}

impl CubeConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CubeError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| CubeError::Config(format!("failed to parse config: {e}")))
    }

    /// Load from default locations (env var, cwd, user config dir, or defaults).
    ///
    /// Search order:
    /// 1. `SALESCUBE_CONFIG` environment variable
    /// 2. `./salescube.toml` (current directory)
    /// 3. `~/.config/salescube/config.toml` (user config dir)
    /// 4. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var("SALESCUBE_CONFIG") {
            match Self::from_file(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "loaded config from SALESCUBE_CONFIG");
                    return cfg;
                }
                Err(e) => tracing::warn!(path = %path, error = %e, "ignoring SALESCUBE_CONFIG"),
            }
        }

        if let Ok(cfg) = Self::from_file("salescube.toml") {
            tracing::info!("loaded config from ./salescube.toml");
            return cfg;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("salescube").join("config.toml");
            if let Ok(cfg) = Self::from_file(&user_config) {
                tracing::info!(path = %user_config.display(), "loaded config from user config dir");
                return cfg;
            }
        }

        tracing::debug!("no config file found, using defaults");
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = CubeConfig::default();
        assert_eq!(cfg.warehouse.backend, BackendKind::DuckDb);
        assert_eq!(cfg.display.max_product_columns, 8);
        assert_eq!(cfg.display.max_cell_width, 12);
        assert_eq!(cfg.navigation.geo_level, "region");
        assert_eq!(cfg.navigation.year, Some(2019));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[warehouse]
backend = "postgres"

[warehouse.postgres]
connection_string = "postgresql://dw:secret@db/warehouse"
statement_timeout_ms = 5000

[display]
max_product_columns = 4
"#;
        let cfg = CubeConfig::from_toml(toml).unwrap();
        assert_eq!(cfg.warehouse.backend, BackendKind::Postgres);
        assert_eq!(cfg.warehouse.postgres.statement_timeout_ms, 5000);
        assert_eq!(cfg.warehouse.postgres.schema, "public");
        assert_eq!(cfg.display.max_product_columns, 4);
        // untouched sections keep their defaults
        assert_eq!(cfg.display.sample_rows, 10);
        assert_eq!(cfg.navigation.product_level, "productGroup");
    }

    #[test]
    fn test_backend_names() {
        for (name, expected) in [
            ("duckdb", BackendKind::DuckDb),
            ("duck_db", BackendKind::DuckDb),
            ("postgres", BackendKind::Postgres),
        ] {
            let toml = format!("[warehouse]\nbackend = \"{name}\"\n");
            let cfg = CubeConfig::from_toml(&toml).unwrap();
            assert_eq!(cfg.warehouse.backend, expected, "{name}");
        }
        let rendered = toml::to_string(&CubeConfig::default()).unwrap();
        assert!(rendered.contains("backend = \"duckdb\""));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = CubeConfig::from_toml("[display]\nmax_product_columns = \"many\"").unwrap_err();
        assert!(matches!(err, CubeError::Config(_)));
    }
}
