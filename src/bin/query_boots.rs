use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use transepi::{
    config::DbConfig,
    pg::{self, render, status},
    query::{parse_date, Predicate, ProductJoin, Projection, QueryPlan},
    tables::{BOOTS_CARD, BOOTS_SCRAPE},
};

/// Querier for the Boots card transactions. Any combination of the four
/// filters works, ANDed together; `--join` widens rows with the scraped
/// product details.
#[derive(Parser, Debug)]
#[command(
    about = "Postgres querier: Boots transaction data",
    after_help = "Example: query_boots --customer 9874786793 --date 20180601 20180630 --spend"
)]
struct Args {
    /// Print DB and table information instead of querying.
    #[arg(long)]
    details: bool,

    /// Database to query (defaults to the configured one).
    #[arg(short, long)]
    db: Option<String>,

    /// Customer code to query, e.g. 9874786793.
    #[arg(long)]
    customer: Option<String>,

    /// Product code to query, e.g. 8199922.
    #[arg(long)]
    product: Option<String>,

    /// Shop date, YYYYMMDD; give two dates for an inclusive range.
    #[arg(long, num_args = 1..=2, value_name = "YYYYMMDD")]
    date: Vec<String>,

    /// Store name fragment to match.
    #[arg(long)]
    store: Option<String>,

    /// Return the record count instead of rows.
    #[arg(long)]
    count: bool,

    /// Return total spend instead of rows.
    #[arg(long)]
    spend: bool,

    /// LEFT JOIN transactions onto the scraped product table.
    #[arg(long)]
    join: bool,

    /// Write raw-row results to this CSV file instead of stdout.
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

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
    let mut cfg = DbConfig::load(args.config.as_deref())?;
    if let Some(db) = &args.db {
        cfg = cfg.with_database(db);
    }
    let card_table = cfg.tables.boots_transactions.clone();
    let product_table = cfg.tables.boots_products.clone();
    let client = pg::connect(&cfg).await?;

    if !status::table_exists(&client, &card_table).await? {
        let existing = status::list_tables(&client).await?;
        bail!(
            "`{card_table}` doesn't exist in database `{}`.\n\
             Tables currently there: {}.\n\
             To load a card export, see load_boots_card.",
            cfg.database,
            if existing.is_empty() { "(none)".to_string() } else { existing.join(", ") }
        );
    }

    let no_query = args.customer.is_none()
        && args.product.is_none()
        && args.date.is_empty()
        && args.store.is_none()
        && !args.count
        && !args.spend
        && !args.join;
    if args.details || no_query {
        println!(
            "Connected to `{}` on {}:{} as {}.",
            cfg.database, cfg.host, cfg.port, cfg.user
        );
        status::print_table_summary(&client, &card_table, &BOOTS_CARD).await?;
        status::print_table_summary(&client, &product_table, &BOOTS_SCRAPE).await?;
        println!("\nAbove are some details about the current DB. Please provide a query.");
        return Ok(());
    }

    let projection = Projection::from_flags(args.count, args.spend)?;
    let dates = args
        .date
        .iter()
        .map(|d| parse_date(d))
        .collect::<Result<Vec<_>>>()?;

    let mut plan = QueryPlan::new(&card_table, projection, "SPEND")
        .filter_opt(args.customer.as_deref().map(|c| Predicate::text_eq("ID", c)))
        .filter_opt(args.product.as_deref().map(|p| Predicate::text_eq("ITEM_CODE", p)))
        .filter_opt(args.store.as_deref().map(|s| Predicate::contains("STORE", s)));
    if !dates.is_empty() {
        plan = plan.filter(Predicate::dates("DATE2", &dates)?);
    }
    if args.join {
        plan = plan.join(ProductJoin {
            product_table: product_table.clone(),
            transaction_column: "ITEM_CODE",
            product_column: "PRODUCTID",
        });
    }

    let sql = plan.sql();
    info!(%sql, "running query");
    let rows = client.query(sql.as_str(), &plan.params()).await?;

    match projection {
        Projection::Rows => match &args.csv {
            Some(path) => {
                if rows.is_empty() {
                    println!("No matching records; nothing written.");
                } else {
                    let records: Vec<Vec<String>> = rows.iter().map(render::row_cells).collect();
                    render::write_csv(path, &render::header(&rows), &records)?;
                    println!("OK, {} records written to {}.", rows.len(), path.display());
                }
            }
            None => render::print_rows(&rows),
        },
        Projection::Count | Projection::Spend => render::print_single(&rows),
    }

    Ok(())
}
