//! Turning dynamically-typed result rows into text.
//!
//! The queriers run `SELECT *` over tables whose column sets differ per
//! dataset (and grow under `--join`), so rows are rendered generically from
//! the wire types rather than through per-table structs. Only the types our
//! DDL can produce need handling; anything else renders as `?`.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::path::Path;
use tokio_postgres::{types::Type, Row};

/// One cell as text; SQL NULL renders as the empty string.
pub fn cell_text(row: &Row, idx: usize) -> String {
    let ty = row.columns()[idx].type_().clone();
    if ty == Type::VARCHAR || ty == Type::TEXT || ty == Type::BPCHAR || ty == Type::NAME {
        show(row.try_get::<_, Option<String>>(idx))
    } else if ty == Type::INT4 {
        show(row.try_get::<_, Option<i32>>(idx))
    } else if ty == Type::INT8 {
        show(row.try_get::<_, Option<i64>>(idx))
    } else if ty == Type::FLOAT4 {
        show(row.try_get::<_, Option<f32>>(idx))
    } else if ty == Type::FLOAT8 {
        show(row.try_get::<_, Option<f64>>(idx))
    } else if ty == Type::DATE {
        show(row.try_get::<_, Option<NaiveDate>>(idx))
    } else if ty == Type::TIME {
        show(row.try_get::<_, Option<NaiveTime>>(idx))
    } else if ty == Type::TIMESTAMP {
        show(row.try_get::<_, Option<NaiveDateTime>>(idx))
    } else if ty == Type::BOOL {
        show(row.try_get::<_, Option<bool>>(idx))
    } else {
        "?".to_string()
    }
}

fn show<T: std::fmt::Display>(value: Result<Option<T>, tokio_postgres::Error>) -> String {
    match value {
        Ok(Some(v)) => v.to_string(),
        Ok(None) => String::new(),
        Err(_) => "?".to_string(),
    }
}

pub fn row_cells(row: &Row) -> Vec<String> {
    (0..row.columns().len()).map(|i| cell_text(row, i)).collect()
}

pub fn header(rows: &[Row]) -> Vec<String> {
    rows.first()
        .map(|r| r.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default()
}

/// Print raw rows, one comma-joined record per line.
pub fn print_rows(rows: &[Row]) {
    for row in rows {
        println!("{}", row_cells(row).join(","));
    }
}

/// Print an aggregate result (single row, single column).
pub fn print_single(rows: &[Row]) {
    match rows.first() {
        Some(row) => {
            let v = cell_text(row, 0);
            println!("{}", if v.is_empty() { "NULL" } else { &v });
        }
        None => println!("NULL"),
    }
}

/// Write result rows (with header) to a CSV file.
pub fn write_csv(path: &Path, headers: &[String], records: &[Vec<String>]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating `{}`", path.display()))?;
    writer.write_record(headers)?;
    for record in records {
        writer.write_record(record)?;
    }
    writer
        .flush()
        .with_context(|| format!("flushing `{}`", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_csv_emits_header_then_records() -> Result<()> {
        let dir = tempdir()?;
        let out = dir.path().join("result.csv");
        let headers = vec!["ID".to_string(), "SPEND".to_string()];
        let records = vec![
            vec!["9874786793".to_string(), "4.20".to_string()],
            vec!["9874786793".to_string(), "".to_string()],
        ];
        write_csv(&out, &headers, &records)?;
        let body = std::fs::read_to_string(&out)?;
        let mut lines = body.lines();
        assert_eq!(lines.next(), Some("ID,SPEND"));
        assert_eq!(lines.next(), Some("9874786793,4.20"));
        assert_eq!(lines.next(), Some("9874786793,"));
        Ok(())
    }
}
