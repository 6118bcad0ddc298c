use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use transepi::convert::tesco;

/// Standalone JSON-to-CSV converter for Tesco Clubcard exports: one CSV row
/// per purchased item, with synthetic customer and basket identifiers
/// (hashes of transaction metadata — the exports carry no stable ids).
#[derive(Parser, Debug)]
#[command(
    about = "JSON to CSV converter: Tesco Clubcards",
    after_help = "Example: tesco_json2csv -i clubcard_42.json"
)]
struct Args {
    /// JSON file to convert.
    #[arg(short, long, value_name = "PATH")]
    input: PathBuf,

    /// Output CSV path (defaults to the input with a .csv extension).
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let (out, items) = tesco::json_to_csv(&args.input, args.output.as_deref())?;
    println!(
        "OK, JSON {} converted to CSV {} ({items} item rows).",
        args.input.display(),
        out.display()
    );
    Ok(())
}
