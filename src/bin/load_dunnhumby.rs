use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use transepi::{
    config::DbConfig,
    pg::{self, copy, status},
    tables::DUNN_HUMBY,
    util::expand_inputs,
};

/// Importer for the Dunnhumby "Let's Get Sort-of-Real" transaction CSVs.
/// The dataset ships as one CSV per week, so this takes any number of
/// files (or a glob) and loads them all into the one table.
#[derive(Parser, Debug)]
#[command(
    about = "Postgres importer: Dunnhumby transaction datasets",
    after_help = "Example: load_dunnhumby -i 'transactions_2008*.csv'"
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
    let table = cfg.tables.dunn_humby.clone();
    let client = pg::connect(&cfg).await?;

    let files = expand_inputs(&args.input)?;
    info!(files = files.len(), "importing into `{table}`");
    let mut total = 0;
    for input in &files {
        let (rows, _) = copy::load_csv(&client, &table, &DUNN_HUMBY, input).await?;
        println!("OK, {} imported ({rows} records).", input.display());
        total += rows;
    }
    if files.len() > 1 {
        println!("\n{total} records imported across {} files.", files.len());
    }

    status::print_table_summary(&client, &table, &DUNN_HUMBY).await?;
    Ok(())
}
