use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use transepi::{
    config::DbConfig,
    convert::encoding,
    pg::{self, copy, status},
    tables::BOOTS_CARD,
    util::expand_inputs,
};

/// Importer for Boots Advantage loyalty-card exports. The exports arrive as
/// UTF-16 TSV; each file is normalized to UTF-8 CSV before the bulk copy.
#[derive(Parser, Debug)]
#[command(
    about = "Postgres importer: Boots Advantage loyalty cards",
    after_help = "Example: load_boots_card -i card4374832.csv"
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
    let table = cfg.tables.boots_transactions.clone();
    let client = pg::connect(&cfg).await?;

    for input in expand_inputs(&args.input)? {
        let normalized = encoding::normalize_card_export(&input)?;
        info!(file = %input.display(), "importing into `{table}`, just a moment");
        let (rows, _) = copy::load_csv(&client, &table, &BOOTS_CARD, &normalized).await?;
        println!("OK, {} imported ({rows} records).", input.display());
    }

    status::print_table_summary(&client, &table, &BOOTS_CARD).await?;
    Ok(())
}
