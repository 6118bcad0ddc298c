use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use transepi::{
    config::DbConfig,
    pg::{self, copy, status},
    tables::{validate_identifier, BOOTS_SCRAPE, DUNN_HUMBY},
    util::expand_inputs,
};

/// Generic importer: load a known CSV shape into a table of your choosing,
/// for ad-hoc side tables next to the standard ones.
#[derive(Parser, Debug)]
#[command(
    about = "Postgres importer: load a CSV into a named table",
    after_help = "Example: csv2pg -d database1 -t week14 -i transactions_200814.csv"
)]
struct Args {
    /// Database to import into (defaults to the configured one).
    #[arg(short, long)]
    db: Option<String>,

    /// Table to create/extend.
    #[arg(short, long)]
    table: String,

    /// CSV file(s) to import; glob patterns are expanded.
    #[arg(short, long, value_name = "PATH", required = true, num_args = 1..)]
    input: Vec<String>,

    /// The input is a Boots scrape CSV rather than a Dunnhumby transaction CSV.
    #[arg(short, long)]
    scrape: bool,

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
    validate_identifier(&args.table)?;
    let mut cfg = DbConfig::load(args.config.as_deref())?;
    if let Some(db) = &args.db {
        cfg = cfg.with_database(db);
    }
    let client = pg::connect(&cfg).await?;

    let spec = if args.scrape { &BOOTS_SCRAPE } else { &DUNN_HUMBY };
    for input in expand_inputs(&args.input)? {
        info!(file = %input.display(), db = %cfg.database, "importing into `{}`", args.table);
        let (staged, kept) = copy::load_csv(&client, &args.table, spec, &input).await?;
        if staged == kept {
            println!("OK, {} imported ({kept} records).", input.display());
        } else {
            println!(
                "OK, {} imported ({kept} new records, {} duplicates skipped).",
                input.display(),
                staged - kept
            );
        }
    }

    status::print_table_summary(&client, &args.table, spec).await?;
    Ok(())
}
