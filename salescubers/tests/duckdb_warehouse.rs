//! End-to-end tests against a DuckDB star schema on disk.
#![cfg(feature = "duckdb")]

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use salescube::backends::DuckDbConnection;
use salescube::classify::{classify_cross_table, CrossTableLevel};
use salescube::config::{BackendKind, CubeConfig};
use salescube::render::NO_DATA;
use salescube::{AggregationLevel, AggregationRequest, Measure, OlapAnalyzer};

const SCHEMA: &str = "
    CREATE TABLE dimshop (
        shopkey INTEGER PRIMARY KEY,
        shopname VARCHAR,
        cityname VARCHAR,
        regionname VARCHAR,
        countryname VARCHAR
    );
    CREATE TABLE dimdate (
        datekey INTEGER PRIMARY KEY,
        fulldate DATE,
        year INTEGER,
        quarter INTEGER,
        month INTEGER,
        day INTEGER
    );
    CREATE TABLE dimproduct (
        productkey INTEGER PRIMARY KEY,
        articlename VARCHAR,
        productgroupname VARCHAR,
        productfamilyname VARCHAR,
        productcategoryname VARCHAR
    );
    CREATE TABLE factsales (
        datekey INTEGER,
        shopkey INTEGER,
        productkey INTEGER,
        quantitysold INTEGER,
        revenue DOUBLE
    );
";

const DIMENSIONS: &str = "
    INSERT INTO dimshop VALUES
        (1, 'Shop A', 'Berlin', 'North', 'Germany'),
        (2, 'Shop B', 'Munich', 'South', 'Germany'),
        (3, 'Shop C', 'Hamburg', 'North', 'Germany');
    INSERT INTO dimdate VALUES
        (1, '2019-01-15', 2019, 1, 1, 15),
        (2, '2019-04-02', 2019, 2, 4, 2),
        (3, '2020-02-01', 2020, 1, 2, 1);
    INSERT INTO dimproduct VALUES
        (1, 'Whole Milk 1L', 'Milk', 'Dairy', 'Food'),
        (2, 'Rye Bread', 'Bread', 'Bakery', 'Food'),
        (3, 'Cola 0.5L', 'Soft Drinks', 'Beverages', 'Drinks');
";

const FACTS: &str = "
    INSERT INTO factsales VALUES
        (1, 1, 1, 10, 12.5),
        (1, 2, 2, 4, 10.0),
        (2, 3, 1, 6, 7.5),
        (2, 1, 3, 2, 3.0),
        (3, 2, 3, 5, 7.5);
";

fn bootstrap(db_path: &Path, with_facts: bool) -> anyhow::Result<()> {
    let conn = duckdb::Connection::open(db_path)?;
    conn.execute_batch(SCHEMA)?;
    conn.execute_batch(DIMENSIONS)?;
    if with_facts {
        conn.execute_batch(FACTS)?;
    }
    Ok(())
}

fn analyzer(db_path: &Path) -> OlapAnalyzer {
    OlapAnalyzer::new(Arc::new(DuckDbConnection::new(db_path).with_max_concurrency(2)))
}

fn request(year: Option<i32>) -> AggregationRequest {
    AggregationRequest::new("region", "quarter", "productGroup", year)
}

#[tokio::test]
async fn cube_produces_all_eight_levels() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("warehouse.duckdb");
    bootstrap(&db_path, true)?;

    let analysis = analyzer(&db_path).run_cube_analysis(&request(Some(2019))).await?;
    let masks: HashSet<_> = analysis.rows.iter().map(|r| r.rollup).collect();
    assert_eq!(masks.len(), 8);
    for (level, count) in &analysis.level_counts {
        assert!(*count > 0, "no rows for {level}");
    }

    let detail_revenue: f64 = analysis
        .rows_at(AggregationLevel::Detail)
        .map(|r| r.total_revenue)
        .sum();
    let grand = analysis.grand_total().expect("grand total row");
    assert!((detail_revenue - grand.total_revenue).abs() < 1e-9);
    assert!((grand.total_revenue - 33.0).abs() < 1e-9);
    assert_eq!(grand.transaction_count, 4);
    assert_eq!(grand.total_quantity, 22);

    // Rows come back detail first and grand total last.
    assert_eq!(analysis.rows.first().map(|r| r.level), Some(AggregationLevel::Detail));
    assert_eq!(analysis.rows.last().map(|r| r.level), Some(AggregationLevel::GrandTotal));
    Ok(())
}

#[tokio::test]
async fn cross_table_uses_exactly_five_subsets() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("warehouse.duckdb");
    bootstrap(&db_path, true)?;

    let report = analyzer(&db_path)
        .run_cross_table(&request(Some(2019)), Measure::TotalRevenue)
        .await?;
    let table = report.table.expect("table");

    assert_eq!(table.columns, vec!["Bread", "Milk", "Soft Drinks"]);
    assert_eq!(table.cell("North", "quarter 1, 2019", "Milk"), Some(12.5));
    assert_eq!(table.cell("North", "quarter 2, 2019", "Milk"), Some(7.5));
    assert_eq!(table.cell("North", "quarter 2, 2019", "Soft Drinks"), Some(3.0));
    assert_eq!(table.cell("North", "quarter 1, 2019", "Bread"), Some(0.0));
    assert_eq!(table.cell("South", "quarter 1, 2019", "Bread"), Some(10.0));
    assert!((table.grand_total.total - 33.0).abs() < 1e-9);
    assert!(table.warnings.is_empty(), "{:?}", table.warnings);
    assert!(table.verify().is_empty());
    assert_eq!(table.reported_grand_total, Some(33.0));
    assert_eq!(table.reported_geographic_totals.len(), 2);
    Ok(())
}

#[tokio::test]
async fn cross_table_rows_never_use_omitted_subsets() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("warehouse.duckdb");
    bootstrap(&db_path, true)?;

    let connection = DuckDbConnection::new(&db_path);
    assert_eq!(connection.database_path(), db_path.as_path());
    let builder = salescube::SqlBuilder::default();
    let query = builder.build_cross_table_query(&request(None), &salescube::dialect::DuckDbDialect)?;
    let result =
        salescube::BackendConnection::execute_sql(&connection, &query.sql, &query.params).await?;
    let rows = salescube::executor::decode_aggregated_rows(&result)?;

    let levels: HashSet<_> = rows.iter().map(|r| classify_cross_table(r.rollup)).collect();
    assert_eq!(levels.len(), 5);
    assert!(!levels.contains(&CrossTableLevel::Unknown));
    Ok(())
}

#[tokio::test]
async fn shop_without_region_is_labelled_null() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("warehouse.duckdb");
    bootstrap(&db_path, true)?;
    {
        let conn = duckdb::Connection::open(&db_path)?;
        conn.execute_batch(
            "INSERT INTO dimshop VALUES (4, 'Shop D', 'Bonn', NULL, 'Germany');
             INSERT INTO factsales VALUES (1, 4, 1, 1, 2.0);",
        )?;
    }

    let analysis = analyzer(&db_path).run_cube_analysis(&request(Some(2019))).await?;
    let unlabelled: Vec<_> = analysis
        .rows_at(AggregationLevel::Detail)
        .filter(|r| r.geo.as_value() == Some("(null)"))
        .collect();
    assert_eq!(unlabelled.len(), 1);
    assert_eq!(analysis.count_at(AggregationLevel::GrandTotal), 1);
    Ok(())
}

#[tokio::test]
async fn unmatched_year_yields_no_rows() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("warehouse.duckdb");
    bootstrap(&db_path, true)?;
    let analyzer = analyzer(&db_path);

    let analysis = analyzer.run_cube_analysis(&request(Some(1999))).await?;
    assert!(analysis.rows.is_empty());

    let report = analyzer
        .run_cross_table(&request(Some(1999)), Measure::TotalQuantity)
        .await?;
    assert!(report.table.is_none());
    assert!(report.text.contains(NO_DATA));
    Ok(())
}

#[tokio::test]
async fn summary_statistics_cover_the_whole_fact_table() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("warehouse.duckdb");
    bootstrap(&db_path, true)?;

    let stats = analyzer(&db_path).summary_statistics().await;
    assert_eq!(stats.total_transactions, Some(5));
    assert!((stats.total_revenue.unwrap() - 40.5).abs() < 1e-9);
    assert_eq!(stats.distinct_products, Some(3));
    assert_eq!(stats.distinct_shops, Some(3));
    assert_eq!(stats.date_range.unwrap().to_string(), "2019-01-15 to 2020-02-01");
    Ok(())
}

#[tokio::test]
async fn empty_fact_table() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("warehouse.duckdb");
    bootstrap(&db_path, false)?;
    let analyzer = analyzer(&db_path);

    let analysis = analyzer.run_cube_analysis(&request(None)).await?;
    assert!(analysis.rows.is_empty());
    let stats = analyzer.summary_statistics().await;
    assert!(stats.is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_database_file_degrades() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let toml = format!(
        "[warehouse]\nbackend = \"duckdb\"\n\n[warehouse.duckdb]\npath = {:?}\n",
        dir.path().join("nested/missing/warehouse.duckdb")
    );
    let config = CubeConfig::from_toml(&toml)?;
    assert_eq!(config.warehouse.backend, BackendKind::DuckDb);

    let analyzer = OlapAnalyzer::from_config(&config)?;
    let analysis = analyzer.run_cube_analysis(&request(None)).await?;
    assert!(analysis.rows.is_empty());
    Ok(())
}
