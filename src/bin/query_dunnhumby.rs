use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use transepi::{
    config::DbConfig,
    pg::{self, render, status},
    query::{parse_date_int, Predicate, Projection, QueryPlan},
    tables::DUNN_HUMBY,
};

/// Querier for the Dunnhumby weekly-basket table. The dataset keeps its
/// calendar fields as plain integers (YYYYMMDD dates, YYYYNN weeks), so the
/// temporal filters here bind integer parameters.
#[derive(Parser, Debug)]
#[command(
    about = "Postgres querier: Dunnhumby transaction data",
    after_help = "Example: query_dunnhumby --customer CUST0123456789 --date 20080414 --spend"
)]
struct Args {
    /// Print DB and table information instead of querying.
    #[arg(long)]
    details: bool,

    /// Database to query (defaults to the configured one).
    #[arg(short, long)]
    db: Option<String>,

    /// Customer code to query. Format: CUST0123456789
    #[arg(long)]
    customer: Option<String>,

    /// Product code to query. Format: PRD0123456
    #[arg(long)]
    product: Option<String>,

    /// Basket ID to query. Format: 123450123456789
    #[arg(long)]
    basket: Option<String>,

    /// Shop date, YYYYMMDD; give two dates for an inclusive range.
    #[arg(long, num_args = 1..=2, value_name = "YYYYMMDD")]
    date: Vec<String>,

    /// Shop hour to query (24 hour). Format: HH
    #[arg(long)]
    hour: Option<String>,

    /// Shop week of year to query. Format: YYYYNN
    #[arg(long)]
    week: Option<String>,

    /// Shop weekday to query (1-7).
    #[arg(long)]
    weekday: Option<String>,

    /// Return the record count instead of rows.
    #[arg(long)]
    count: bool,

    /// Return total spend instead of rows.
    #[arg(long)]
    spend: bool,

    /// Write raw-row results to this CSV file instead of stdout.
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Path to a db.yaml config file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn parse_bounded(raw: &str, what: &str, lo: i32, hi: i32) -> Result<i32> {
    let value: i32 = raw
        .parse()
        .with_context(|| format!("{what} `{raw}` is not a number"))?;
    if !(lo..=hi).contains(&value) {
        bail!("{what} `{raw}` is out of range ({lo}-{hi})");
    }
    Ok(value)
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
    let table = cfg.tables.dunn_humby.clone();
    let client = pg::connect(&cfg).await?;

    if !status::table_exists(&client, &table).await? {
        let existing = status::list_tables(&client).await?;
        bail!(
            "`{table}` doesn't exist in database `{}`.\n\
             Tables currently there: {}.\n\
             To load the dataset, see load_dunnhumby.",
            cfg.database,
            if existing.is_empty() { "(none)".to_string() } else { existing.join(", ") }
        );
    }

    let no_query = args.customer.is_none()
        && args.product.is_none()
        && args.basket.is_none()
        && args.date.is_empty()
        && args.hour.is_none()
        && args.week.is_none()
        && args.weekday.is_none()
        && !args.count
        && !args.spend;
    if args.details || no_query {
        println!(
            "Connected to `{}` on {}:{} as {}.",
            cfg.database, cfg.host, cfg.port, cfg.user
        );
        status::print_table_summary(&client, &table, &DUNN_HUMBY).await?;
        println!("\nAbove are some details about the current DB. Please provide a query.");
        return Ok(());
    }

    let projection = Projection::from_flags(args.count, args.spend)?;
    let dates = args
        .date
        .iter()
        .map(|d| parse_date_int(d))
        .collect::<Result<Vec<_>>>()?;
    let hour = args
        .hour
        .as_deref()
        .map(|h| parse_bounded(h, "shop hour", 0, 23))
        .transpose()?;
    let week = args
        .week
        .as_deref()
        .map(|w| w.parse::<i32>().with_context(|| format!("shop week `{w}` is not a number")))
        .transpose()?;
    let weekday = args
        .weekday
        .as_deref()
        .map(|d| parse_bounded(d, "shop weekday", 1, 7))
        .transpose()?;

    let mut plan = QueryPlan::new(&table, projection, "SPEND")
        .filter_opt(args.customer.as_deref().map(|c| Predicate::text_eq("CUST_CODE", c)))
        .filter_opt(args.product.as_deref().map(|p| Predicate::text_eq("PROD_CODE", p)))
        .filter_opt(args.basket.as_deref().map(|b| Predicate::text_eq("BASKET_ID", b)))
        .filter_opt(hour.map(|h| Predicate::int_eq("SHOP_HOUR", h)))
        .filter_opt(week.map(|w| Predicate::int_eq("SHOP_WEEK", w)))
        .filter_opt(weekday.map(|d| Predicate::int_eq("SHOP_WEEKDAY", d)));
    if !dates.is_empty() {
        plan = plan.filter(Predicate::int_dates("SHOP_DATE", &dates)?);
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
