use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use transepi::{
    config::DbConfig,
    convert::tesco,
    pg::{self, copy, status},
    tables::TESCO_CARD,
    util::expand_inputs,
};

/// Importer for Tesco Clubcard exports. JSON exports are flattened to CSV
/// first (see tesco_json2csv for the standalone converter); CSV inputs load
/// directly.
#[derive(Parser, Debug)]
#[command(
    about = "Postgres importer: Tesco Clubcard loyalty cards",
    after_help = "Example: load_tesco_card -i clubcard_42.json"
)]
struct Args {
    /// JSON or CSV file(s) to import; glob patterns are expanded.
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
    let table = cfg.tables.tesco_transactions.clone();
    let client = pg::connect(&cfg).await?;

    for input in expand_inputs(&args.input)? {
        let csv_path = if input.extension().is_some_and(|e| e == "json") {
            let (converted, items) = tesco::json_to_csv(&input, None)?;
            info!(items, from = %input.display(), to = %converted.display(), "flattened JSON export");
            converted
        } else {
            input.clone()
        };
        info!(file = %input.display(), "importing into `{table}`, just a moment");
        let (rows, _) = copy::load_csv(&client, &table, &TESCO_CARD, &csv_path).await?;
        println!("OK, {} imported ({rows} records).", input.display());
    }

    status::print_table_summary(&client, &table, &TESCO_CARD).await?;
    Ok(())
}
