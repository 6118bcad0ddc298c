use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use transepi::{
    config::DbConfig,
    pg::{self, copy, status},
    tables::FOOD_PRODUCTS,
    util::expand_inputs,
};

/// Importer for the food-products reference CSV. The published file
/// contains repeated products, so rows stage first and duplicates (by
/// product id) are dropped on the way into the real table.
#[derive(Parser, Debug)]
#[command(
    about = "Postgres importer: food products reference dataset",
    after_help = "Example: load_food_products -i foodproducts.csv"
)]
struct Args {
    /// CSV file(s) to import; glob patterns are expanded.
    #[arg(short, long, value_name = "PATH", required = true, num_args = 1..)]
    input: Vec<String>,

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
    let table = cfg.tables.food_products.clone();
    let client = pg::connect(&cfg).await?;

    for input in expand_inputs(&args.input)? {
        info!(file = %input.display(), "importing into `{table}`, just a moment");
        let (staged, kept) = copy::load_csv(&client, &table, &FOOD_PRODUCTS, &input).await?;
        println!(
            "OK, {} imported ({kept} new records, {} duplicates skipped).",
            input.display(),
            staged - kept
        );
    }

    status::print_table_summary(&client, &table, &FOOD_PRODUCTS).await?;
    Ok(())
}
