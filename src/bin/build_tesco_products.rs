use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use transepi::{
    config::DbConfig,
    pg::{self, status},
    tables::validate_identifier,
};

/// Derive a Tesco product table from the loaded transactions. The export
/// carries no product catalogue, and the only trustworthy product field in
/// the transaction data is the name, so products are the distinct names
/// with a generated integer id.
#[derive(Parser, Debug)]
#[command(
    about = "Postgres: build the Tesco product table from loaded transactions",
    after_help = "Example: build_tesco_products"
)]
struct Args {
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
    let transactions = cfg.tables.tesco_transactions.clone();
    let products = cfg.tables.tesco_products.clone();
    validate_identifier(&transactions)?;
    validate_identifier(&products)?;

    let client = pg::connect(&cfg).await?;
    if !status::table_exists(&client, &transactions).await? {
        anyhow::bail!(
            "`{transactions}` does not exist; load a Clubcard export first (see load_tesco_card)"
        );
    }

    client
        .execute(
            format!(
                "CREATE TABLE IF NOT EXISTS {products} (\n    \
                 product_id INT GENERATED ALWAYS AS IDENTITY,\n    \
                 product_name VARCHAR UNIQUE)"
            )
            .as_str(),
            &[],
        )
        .await?;

    let inserted = client
        .execute(
            format!(
                "INSERT INTO {products} (product_name) \
                 SELECT DISTINCT product_name FROM {transactions} \
                 WHERE product_name IS NOT NULL \
                 ON CONFLICT (product_name) DO NOTHING"
            )
            .as_str(),
            &[],
        )
        .await?;
    info!(inserted, "product table refreshed");
    println!("OK, {inserted} new products added to `{products}`.");

    let total = status::record_count(&client, &products).await?;
    println!("`{products}` now holds {total} products.");
    Ok(())
}
