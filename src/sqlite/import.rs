//! CSV import into SQLite, with column types inferred from a row sample.
//!
//! A fresh table is created straight from the CSV header. Importing into an
//! existing table appends with whole-row deduplication: rows land in a temp
//! staging table and only those not already present move across (EXCEPT
//! anti-join), so re-importing an overlapping export is harmless.

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::info;

use crate::tables::validate_identifier;

/// SQLite column affinity inferred for one CSV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Real,
    Text,
}

impl SqlType {
    pub fn as_sql(self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Text => "TEXT",
        }
    }

    fn of_value(value: &str) -> SqlType {
        if value.parse::<i64>().is_ok() {
            SqlType::Integer
        } else if value.parse::<f64>().is_ok() {
            SqlType::Real
        } else {
            SqlType::Text
        }
    }

    /// Widen to cover another observed value.
    fn widen(self, other: SqlType) -> SqlType {
        use SqlType::*;
        match (self, other) {
            (Integer, Integer) => Integer,
            (Text, _) | (_, Text) => Text,
            _ => Real,
        }
    }
}

/// Number of records sampled when inferring column types.
pub const INFER_SAMPLE: usize = 1000;

/// Headers and inferred types for a CSV file. Columns that are empty
/// throughout the sample fall back to TEXT.
pub fn infer_schema(path: &Path) -> Result<(Vec<String>, Vec<SqlType>)> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening `{}`", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV header")?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.is_empty() {
        bail!("`{}` has no header row", path.display());
    }

    let mut types: Vec<Option<SqlType>> = vec![None; headers.len()];
    for record in reader.records().take(INFER_SAMPLE) {
        let record = record.context("CSV parse error while sampling")?;
        for (i, cell) in record.iter().enumerate().take(headers.len()) {
            if cell.is_empty() {
                continue;
            }
            let observed = SqlType::of_value(cell);
            types[i] = Some(match types[i] {
                Some(t) => t.widen(observed),
                None => observed,
            });
        }
    }

    Ok((headers, types.into_iter().map(|t| t.unwrap_or(SqlType::Text)).collect()))
}

/// What an import did.
#[derive(Debug, PartialEq, Eq)]
pub struct ImportOutcome {
    pub created_table: bool,
    pub inserted: usize,
}

fn quoted_columns(headers: &[String]) -> String {
    headers
        .iter()
        .map(|h| format!("\"{h}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

fn insert_all(conn: &Connection, table: &str, path: &Path, width: usize) -> Result<usize> {
    let placeholders = vec!["?"; width].join(", ");
    let mut stmt = conn.prepare(&format!("INSERT INTO \"{table}\" VALUES ({placeholders})"))?;
    let mut reader = csv::Reader::from_path(path)?;
    let mut inserted = 0;
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("CSV parse error at row {row}"))?;
        if record.len() != width {
            bail!("row {row} has {} fields, expected {width}", record.len());
        }
        stmt.execute(rusqlite::params_from_iter(record.iter()))?;
        inserted += 1;
    }
    Ok(inserted)
}

/// Import a CSV into `table`, creating it if needed.
pub fn import_csv(conn: &mut Connection, table: &str, path: &Path) -> Result<ImportOutcome> {
    validate_identifier(table)?;
    let (headers, types) = infer_schema(path)?;

    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [table],
        |row| row.get(0),
    )?;

    let tx = conn.transaction().context("starting import transaction")?;
    let outcome = if !exists {
        let cols: Vec<String> = headers
            .iter()
            .zip(&types)
            .map(|(h, t)| format!("\"{h}\" {}", t.as_sql()))
            .collect();
        tx.execute_batch(&format!(
            "CREATE TABLE \"{table}\" ({})",
            cols.join(", ")
        ))
        .with_context(|| format!("creating table `{table}`"))?;
        info!(table, columns = headers.len(), "created new table");
        let inserted = insert_all(&tx, table, path, headers.len())?;
        ImportOutcome { created_table: true, inserted }
    } else {
        let existing_width = tx
            .prepare(&format!("PRAGMA table_info(\"{table}\")"))?
            .query_map([], |_| Ok(()))?
            .count();
        if existing_width != headers.len() {
            bail!(
                "`{}` has {} columns but table `{table}` has {existing_width}",
                path.display(),
                headers.len()
            );
        }
        // Stage, then move only rows the table does not already hold.
        let staging = format!("{table}_incoming");
        tx.execute_batch(&format!(
            "CREATE TEMP TABLE \"{staging}\" AS SELECT {} FROM \"{table}\" WHERE 0",
            quoted_columns(&headers)
        ))?;
        insert_all(&tx, &staging, path, headers.len())?;
        tx.execute(
            &format!(
                "INSERT INTO \"{table}\" SELECT * FROM \"{staging}\" \
                 EXCEPT SELECT * FROM \"{table}\""
            ),
            [],
        )?;
        let inserted = tx.changes() as usize;
        tx.execute_batch(&format!("DROP TABLE \"{staging}\""))?;
        ImportOutcome { created_table: false, inserted }
    };
    tx.commit().context("committing import")?;
    Ok(outcome)
}

/// Unique index on one column, for the code fields queries hit hardest.
pub fn create_unique_index(
    conn: &Connection,
    table: &str,
    index_name: &str,
    column: &str,
) -> Result<()> {
    validate_identifier(table)?;
    validate_identifier(index_name)?;
    validate_identifier(column)?;
    conn.execute_batch(&format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {index_name} ON {table}({column})"
    ))
    .with_context(|| format!("creating index `{index_name}` on `{table}({column})`"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_csv(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn types_widen_int_to_real_to_text() {
        assert_eq!(SqlType::of_value("42"), SqlType::Integer);
        assert_eq!(SqlType::of_value("4.2"), SqlType::Real);
        assert_eq!(SqlType::of_value("CUST001"), SqlType::Text);
        assert_eq!(SqlType::Integer.widen(SqlType::Real), SqlType::Real);
        assert_eq!(SqlType::Real.widen(SqlType::Text), SqlType::Text);
    }

    #[test]
    fn infers_schema_from_sample() -> Result<()> {
        let dir = tempdir()?;
        let csv = write_csv(
            dir.path(),
            "items.csv",
            "CUST_CODE,SHOP_DATE,SPEND\nCUST001,20080414,1.5\nCUST002,20080415,2\n",
        );
        let (headers, types) = infer_schema(&csv)?;
        assert_eq!(headers, vec!["CUST_CODE", "SHOP_DATE", "SPEND"]);
        assert_eq!(types, vec![SqlType::Text, SqlType::Integer, SqlType::Real]);
        Ok(())
    }

    #[test]
    fn first_import_creates_and_fills_the_table() -> Result<()> {
        let dir = tempdir()?;
        let csv = write_csv(
            dir.path(),
            "items.csv",
            "CUST_CODE,SHOP_DATE\nCUST001,20080414\nCUST002,20080415\n",
        );
        let mut conn = Connection::open_in_memory()?;
        let outcome = import_csv(&mut conn, "baskets", &csv)?;
        assert_eq!(outcome, ImportOutcome { created_table: true, inserted: 2 });

        let n: i64 = conn.query_row("SELECT COUNT(*) FROM baskets", [], |r| r.get(0))?;
        assert_eq!(n, 2);
        Ok(())
    }

    #[test]
    fn reimport_skips_identical_rows() -> Result<()> {
        let dir = tempdir()?;
        let week1 = write_csv(
            dir.path(),
            "week1.csv",
            "CUST_CODE,SHOP_DATE\nCUST001,20080414\nCUST002,20080415\n",
        );
        let week2 = write_csv(
            dir.path(),
            "week2.csv",
            "CUST_CODE,SHOP_DATE\nCUST002,20080415\nCUST003,20080421\n",
        );
        let mut conn = Connection::open_in_memory()?;
        import_csv(&mut conn, "baskets", &week1)?;
        let outcome = import_csv(&mut conn, "baskets", &week2)?;
        // Only the CUST003 row is new.
        assert_eq!(outcome, ImportOutcome { created_table: false, inserted: 1 });
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM baskets", [], |r| r.get(0))?;
        assert_eq!(n, 3);
        Ok(())
    }

    #[test]
    fn column_mismatch_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let ok = write_csv(dir.path(), "a.csv", "A,B\n1,2\n");
        let wrong = write_csv(dir.path(), "b.csv", "A,B,C\n1,2,3\n");
        let mut conn = Connection::open_in_memory()?;
        import_csv(&mut conn, "t", &ok)?;
        assert!(import_csv(&mut conn, "t", &wrong).is_err());
        Ok(())
    }

    #[test]
    fn unique_index_enforces_the_key() -> Result<()> {
        let dir = tempdir()?;
        let csv = write_csv(dir.path(), "p.csv", "productid,name\n81999,Ibuprofen\n");
        let mut conn = Connection::open_in_memory()?;
        import_csv(&mut conn, "products", &csv)?;
        create_unique_index(&conn, "products", "products_by_id", "productid")?;
        let dup = conn.execute("INSERT INTO products VALUES (81999, 'Other')", []);
        assert!(dup.is_err());
        Ok(())
    }
}
