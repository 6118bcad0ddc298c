use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use transepi::convert::scrub;

/// Post-scrape cleanup: the scraper's HTML flattening glues sentences
/// together ("value.Apply daily"); this re-inserts the missing space in one
/// named column and copies everything else through.
#[derive(Parser, Debug)]
#[command(
    about = "Scrape cleaner: repair punctuation spacing in one CSV column",
    after_help = "Example: clean_scrape -i scrape211101.csv -o cleaned.csv --field DETAILS"
)]
struct Args {
    /// Input CSV file.
    #[arg(short, long, value_name = "PATH")]
    input: PathBuf,

    /// Output CSV file.
    #[arg(short, long, value_name = "PATH")]
    output: PathBuf,

    /// Column name to process.
    #[arg(long)]
    field: String,
}

fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let cleaned = scrub::clean_csv_field(&args.input, &args.output, &args.field)?;
    println!(
        "OK, wrote {} ({cleaned} rows needed repair in `{}`).",
        args.output.display(),
        args.field
    );
    Ok(())
}
