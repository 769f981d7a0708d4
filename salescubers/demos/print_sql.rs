use std::{env, fs, path::PathBuf};

use salescube::{dialect::DuckDbDialect, AggregationRequest, SqlBuilder};

fn usage() {
    eprintln!("Usage: print_sql <request_json> [cube|cross]");
    eprintln!("Example: cargo run --example print_sql -- demos/requests/region_quarter.json cross");
}

fn main() -> anyhow::Result<()> {
    let mut args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        usage();
        std::process::exit(1);
    }

    let request_path = PathBuf::from(args.remove(0));
    let shape = args.first().map(String::as_str).unwrap_or("cube");

    let request_str = fs::read_to_string(request_path)?;
    let request: AggregationRequest = serde_json::from_str(&request_str)?;

    let builder = SqlBuilder::default();
    let query = match shape {
        "cube" => builder.build_cube_query(&request, &DuckDbDialect)?,
        "cross" => builder.build_cross_table_query(&request, &DuckDbDialect)?,
        other => anyhow::bail!("unknown shape {other}; expected cube or cross"),
    };
    println!("{}", query.sql);
    if !query.params.is_empty() {
        println!("-- params: {:?}", query.params);
    }
    Ok(())
}
