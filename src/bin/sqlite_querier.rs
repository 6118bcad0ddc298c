use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use transepi::sqlite::{self, query::Criteria};

/// Querier for SQLite basket tables: customer codes and/or a shop date or
/// date range, ANDed together.
#[derive(Parser, Debug)]
#[command(
    about = "SQLite querier",
    after_help = "Example: sqlite_querier -d database1.db -t baskets --cust CUST0123456789"
)]
struct Args {
    /// Database file to query.
    #[arg(short, long, value_name = "PATH")]
    db: PathBuf,

    /// Table to query.
    #[arg(short, long)]
    table: String,

    /// Customer code(s) to query; multiple codes are OR-combined.
    #[arg(long, num_args = 1.., value_name = "CODE")]
    cust: Vec<String>,

    /// Shop date, YYYYMMDD; give two dates for an inclusive range.
    #[arg(long, num_args = 1..=2, value_name = "YYYYMMDD")]
    date: Vec<String>,
}

fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if !args.db.exists() {
        bail!(
            "the database `{}` doesn't seem to exist here; see csv2sqlite to create one",
            args.db.display()
        );
    }
    let conn = sqlite::connect(&args.db)?;

    let criteria = Criteria { customers: args.cust, dates: args.date };
    let (sql, params) = match sqlite::query::build(&args.table, &criteria) {
        Ok(built) => built,
        Err(e) => {
            // Mirror the importer's summary so a bad query still tells you
            // what there is to query.
            for t in sqlite::examine_db(&conn)? {
                info!(table = %t.name, rows = t.rows, columns = t.columns, "available");
            }
            return Err(e);
        }
    };

    info!(%sql, "running query");
    let rows = sqlite::query::run(&conn, &sql, &params)?;
    for row in &rows {
        println!("{}", row.join(","));
    }
    info!(matches = rows.len(), "done");
    Ok(())
}
