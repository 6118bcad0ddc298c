use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use transepi::{
    config::DbConfig,
    pg::{self, status},
    tables,
};

/// Status reporter for the loaded datasets, plus the two destructive
/// housekeeping operations (dropping a table or a column).
#[derive(Parser, Debug)]
#[command(
    about = "Postgres status reporter",
    after_help = "Example: pg_status --details"
)]
struct Args {
    /// Print per-table record/column/distinct counts for every dataset.
    #[arg(long)]
    details: bool,

    /// Delete a table from the DB. This operation is permanent.
    #[arg(long, value_name = "TABLE")]
    drop_table: Option<String>,

    /// Delete one column from a table. This operation is permanent.
    #[arg(long, value_name = "TABLE.COLUMN")]
    drop_column: Option<String>,

    /// Path to a db.yaml config file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let cfg = DbConfig::load(args.config.as_deref())?;
    let client = pg::connect(&cfg).await?;

    let dbs = status::list_databases(&client).await?;
    match dbs.len() {
        1 => println!("Postgres currently contains 1 DB: {}", dbs.join(", ")),
        n => println!("Postgres currently contains {n} DBs: {}", dbs.join(", ")),
    }

    if args.details {
        let datasets: [(&str, &tables::TableSpec); 5] = [
            (&cfg.tables.boots_transactions, &tables::BOOTS_CARD),
            (&cfg.tables.boots_products, &tables::BOOTS_SCRAPE),
            (&cfg.tables.tesco_transactions, &tables::TESCO_CARD),
            (&cfg.tables.dunn_humby, &tables::DUNN_HUMBY),
            (&cfg.tables.food_products, &tables::FOOD_PRODUCTS),
        ];
        for (table, spec) in datasets {
            status::print_table_summary(&client, table, spec).await?;
        }
    }

    if let Some(table) = &args.drop_table {
        status::drop_table(&client, table).await?;
    }

    if let Some(target) = &args.drop_column {
        let (table, column) = target.split_once('.').ok_or_else(|| {
            anyhow::anyhow!("--drop-column expects TABLE.COLUMN, got `{target}`")
        })?;
        status::drop_column(&client, table, column).await?;
    }

    Ok(())
}
