//! Introspection: what databases and tables exist, how big they are, and
//! the per-dataset distinct-value summaries printed after every load.

use anyhow::{bail, Context, Result};
use tokio_postgres::Client;
use tracing::info;

use crate::tables::{validate_identifier, TableSpec};

/// Non-template databases, excluding the stock `postgres` one.
pub async fn list_databases(client: &Client) -> Result<Vec<String>> {
    let rows = client
        .query(
            "SELECT datname FROM pg_database \
             WHERE NOT datistemplate AND datname <> 'postgres' \
             ORDER BY datname",
            &[],
        )
        .await
        .context("listing databases")?;
    Ok(rows.iter().map(|r| r.get(0)).collect())
}

/// Tables in the public schema.
pub async fn list_tables(client: &Client) -> Result<Vec<String>> {
    let rows = client
        .query(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = 'public' ORDER BY table_name",
            &[],
        )
        .await
        .context("listing tables")?;
    Ok(rows.iter().map(|r| r.get(0)).collect())
}

pub async fn table_exists(client: &Client, table: &str) -> Result<bool> {
    let row = client
        .query_one(
            "SELECT EXISTS(SELECT 1 FROM information_schema.tables WHERE table_name = $1)",
            &[&table],
        )
        .await
        .context("checking table existence")?;
    Ok(row.get(0))
}

pub async fn record_count(client: &Client, table: &str) -> Result<i64> {
    validate_identifier(table)?;
    let row = client
        .query_one(format!("SELECT COUNT(*) FROM {table}").as_str(), &[])
        .await
        .with_context(|| format!("counting rows in `{table}`"))?;
    Ok(row.get(0))
}

pub async fn column_count(client: &Client, table: &str) -> Result<i64> {
    let row = client
        .query_one(
            "SELECT COUNT(*) FROM information_schema.columns WHERE table_name = $1",
            &[&table],
        )
        .await
        .with_context(|| format!("counting columns of `{table}`"))?;
    Ok(row.get(0))
}

pub async fn distinct_count(client: &Client, table: &str, column: &str) -> Result<i64> {
    validate_identifier(table)?;
    validate_identifier(column)?;
    let row = client
        .query_one(
            format!("SELECT COUNT(DISTINCT {column}) FROM {table}").as_str(),
            &[],
        )
        .await
        .with_context(|| format!("counting distinct `{column}` in `{table}`"))?;
    Ok(row.get(0))
}

/// Print the standard post-load summary for one dataset table. A missing
/// table is reported, not an error: status runs over tables that may never
/// have been loaded.
pub async fn print_table_summary(client: &Client, table: &str, spec: &TableSpec) -> Result<()> {
    if !table_exists(client, table).await? {
        println!("\nNo {table} table present.");
        return Ok(());
    }
    let records = record_count(client, table).await?;
    let columns = column_count(client, table).await?;
    println!("\n{table} details:");
    println!("{:<14}{records}", "Records:");
    println!("{:<14}{columns}", "Columns:");
    for item in spec.summary {
        let n = distinct_count(client, table, item.column).await?;
        println!("{:<14}{n}", format!("{}:", item.label));
    }
    // Deduped tables should hold one row per key; say so when they don't,
    // which usually means null key codes slipped through.
    if let Some(key) = spec.conflict_key {
        let keys = distinct_count(client, table, key).await?;
        if keys != records {
            println!(
                "\nNote: record and distinct {key} counts differ by {}. \
                 This may be due to rows with null {key} values.",
                records - keys
            );
        }
    }
    Ok(())
}

/// Drop a table after confirming it exists.
pub async fn drop_table(client: &Client, table: &str) -> Result<()> {
    validate_identifier(table)?;
    if !table_exists(client, table).await? {
        bail!("there is no table called `{table}` in the database");
    }
    let records = record_count(client, table).await?;
    info!(records, "dropping table `{table}`");
    client
        .execute(format!("DROP TABLE IF EXISTS {table}").as_str(), &[])
        .await
        .with_context(|| format!("dropping `{table}`"))?;
    println!("OK, table `{table}` dropped ({records} records).");
    Ok(())
}

/// Drop one column from a table.
pub async fn drop_column(client: &Client, table: &str, column: &str) -> Result<()> {
    validate_identifier(table)?;
    validate_identifier(column)?;
    if !table_exists(client, table).await? {
        bail!("there is no table called `{table}` in the database");
    }
    client
        .execute(
            format!("ALTER TABLE {table} DROP COLUMN IF EXISTS {column}").as_str(),
            &[],
        )
        .await
        .with_context(|| format!("dropping column `{column}` from `{table}`"))?;
    println!("OK, column `{column}` dropped from `{table}`.");
    Ok(())
}
