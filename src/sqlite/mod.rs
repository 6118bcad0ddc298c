//! The file-local workflow: the same load-then-query shape as the Postgres
//! path, but against a single-file SQLite database for work that never
//! leaves one machine.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::info;

pub mod import;
pub mod query;

/// Open (or create) the database file.
pub fn connect(path: &Path) -> Result<Connection> {
    if !path.exists() {
        info!(db = %path.display(), "database does not exist here; creating");
    }
    Connection::open(path).with_context(|| format!("opening database `{}`", path.display()))
}

/// Name, row count and column count for one table.
#[derive(Debug, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub rows: i64,
    pub columns: usize,
}

/// Basic summary of every user table in the database.
pub fn examine_db(conn: &Connection) -> Result<Vec<TableInfo>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let rows: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{name}\""), [], |r| r.get(0))
            .with_context(|| format!("counting rows in `{name}`"))?;
        let columns = conn
            .prepare(&format!("PRAGMA table_info(\"{name}\")"))?
            .query_map([], |_| Ok(()))?
            .count();
        tables.push(TableInfo { name, rows, columns });
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn examine_reports_rows_and_columns() -> Result<()> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE baskets (CUST_CODE TEXT, SHOP_DATE INTEGER, SPEND REAL);
             INSERT INTO baskets VALUES ('CUST001', 20080414, 1.5);
             INSERT INTO baskets VALUES ('CUST002', 20080415, 2.5);",
        )?;
        let tables = examine_db(&conn)?;
        assert_eq!(
            tables,
            vec![TableInfo { name: "baskets".into(), rows: 2, columns: 3 }]
        );
        Ok(())
    }
}
