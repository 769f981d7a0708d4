use std::{fs, path::Path, sync::Arc};

use salescube::{
    backends::DuckDbConnection, logging, CubeConfig, Dimension, DrillNavigator, DrillSession,
    Measure, OlapAnalyzer,
};

fn bootstrap_duckdb(path: &Path) -> anyhow::Result<()> {
    let conn = duckdb::Connection::open(path)?;
    conn.execute_batch(
        "
        CREATE TABLE dimshop (
            shopkey INTEGER PRIMARY KEY, shopname VARCHAR, cityname VARCHAR,
            regionname VARCHAR, countryname VARCHAR
        );
        CREATE TABLE dimdate (
            datekey INTEGER PRIMARY KEY, fulldate DATE, year INTEGER,
            quarter INTEGER, month INTEGER, day INTEGER
        );
        CREATE TABLE dimproduct (
            productkey INTEGER PRIMARY KEY, articlename VARCHAR, productgroupname VARCHAR,
            productfamilyname VARCHAR, productcategoryname VARCHAR
        );
        CREATE TABLE factsales (
            datekey INTEGER, shopkey INTEGER, productkey INTEGER,
            quantitysold INTEGER, revenue DOUBLE
        );
        INSERT INTO dimshop VALUES
            (1, 'Alexanderplatz', 'Berlin', 'North', 'Germany'),
            (2, 'Marienplatz', 'Munich', 'South', 'Germany'),
            (3, 'Jungfernstieg', 'Hamburg', 'North', 'Germany');
        INSERT INTO dimdate VALUES
            (1, '2019-01-15', 2019, 1, 1, 15),
            (2, '2019-04-02', 2019, 2, 4, 2),
            (3, '2019-08-20', 2019, 3, 8, 20);
        INSERT INTO dimproduct VALUES
            (1, 'Whole Milk 1L', 'Milk', 'Dairy', 'Food'),
            (2, 'Rye Bread', 'Bread', 'Bakery', 'Food'),
            (3, 'Cola 0.5L', 'Soft Drinks', 'Beverages', 'Drinks');
        INSERT INTO factsales VALUES
            (1, 1, 1, 10, 12.5),
            (1, 2, 2, 4, 10.0),
            (2, 3, 1, 6, 7.5),
            (2, 1, 3, 2, 3.0),
            (3, 2, 3, 5, 7.5),
            (3, 3, 2, 3, 6.75);
        ",
    )?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let db_path = Path::new("demos/demo.duckdb");
    if db_path.exists() {
        fs::remove_file(db_path)?;
    }
    bootstrap_duckdb(db_path)?;

    let config = CubeConfig::load_default();
    let analyzer = OlapAnalyzer::new(Arc::new(DuckDbConnection::new(db_path)))
        .with_display(config.display.clone());

    print!("{}", analyzer.renderer().summary_statistics(&analyzer.summary_statistics().await));

    let navigator = DrillNavigator::from_config(&config.navigation)?;
    let request = navigator.current_request();

    let analysis = analyzer.run_cube_analysis(&request).await?;
    println!("\n{}", analysis.summary);

    let report = analyzer.run_cross_table(&request, Measure::TotalRevenue).await?;
    println!("{}", report.text);

    let mut session = DrillSession::new(&analyzer, navigator);
    println!("{}", session.navigator().position());
    let step = session.drill_down(Dimension::Geographic).await?;
    println!("{}", step.transition);
    if let Some(view) = step.view {
        println!("{}", view.text);
    }
    Ok(())
}
