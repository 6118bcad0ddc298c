use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use transepi::sqlite::{self, import};

/// File-local importer: load a CSV into a SQLite database, creating the
/// table from the header (with sampled column types) or appending to an
/// existing one with whole-row deduplication.
#[derive(Parser, Debug)]
#[command(
    about = "SQLite importer and updater",
    after_help = "Example: csv2sqlite -f items.csv -d database1.db -t baskets"
)]
struct Args {
    /// CSV file to import.
    #[arg(short, long, value_name = "PATH")]
    file: PathBuf,

    /// Database file to work with (created if missing).
    #[arg(short, long, value_name = "PATH")]
    db: PathBuf,

    /// Table to create/extend.
    #[arg(short, long)]
    table: String,

    /// Column to build a unique index on after the import.
    #[arg(short, long, value_name = "COLUMN")]
    index: Option<String>,
}

fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut conn = sqlite::connect(&args.db)?;

    let outcome = import::import_csv(&mut conn, &args.table, &args.file)?;
    if outcome.created_table {
        println!(
            "OK, created table `{}` with {} records from {}.",
            args.table,
            outcome.inserted,
            args.file.display()
        );
    } else {
        println!(
            "OK, appended {} new records to `{}` (duplicates ignored).",
            outcome.inserted, args.table
        );
    }

    if let Some(column) = &args.index {
        let index_name = format!("{}_{}_idx", args.table, column);
        import::create_unique_index(&conn, &args.table, &index_name, column)?;
        info!(index = %index_name, "unique index in place");
    }

    let tables = sqlite::examine_db(&conn)?;
    println!(
        "\nDatabase `{}` currently contains {} table(s).",
        args.db.display(),
        tables.len()
    );
    for t in tables {
        println!("{} records across {} columns in table `{}`.", t.rows, t.columns, t.name);
    }
    Ok(())
}
