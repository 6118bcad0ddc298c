//! Parameterized filter queries for the basket tables: customer codes
//! (one or more) and a shop date or date range, ANDed together.

use anyhow::{bail, Result};
use rusqlite::Connection;

use crate::tables::validate_identifier;

/// The filters a query run may carry. At least one must be present.
#[derive(Debug, Default)]
pub struct Criteria {
    pub customers: Vec<String>,
    pub dates: Vec<String>,
}

impl Criteria {
    pub fn is_empty(&self) -> bool {
        self.customers.is_empty() && self.dates.is_empty()
    }
}

/// Render `SELECT * FROM table WHERE ...` with `?` placeholders, plus the
/// values to bind. Multiple customers become an IN list; two dates become
/// an inclusive range with the endpoints ordered for the caller.
pub fn build(table: &str, criteria: &Criteria) -> Result<(String, Vec<String>)> {
    validate_identifier(table)?;
    if criteria.is_empty() {
        bail!("provide at least one filter (customer and/or date)");
    }

    let mut clauses = Vec::new();
    let mut params = Vec::new();

    if !criteria.customers.is_empty() {
        let marks = vec!["?"; criteria.customers.len()].join(", ");
        clauses.push(format!("CUST_CODE IN ({marks})"));
        params.extend(criteria.customers.iter().cloned());
    }

    match criteria.dates.as_slice() {
        [] => {}
        [d] => {
            clauses.push("SHOP_DATE = ?".to_string());
            params.push(d.clone());
        }
        [a, b] => {
            clauses.push("SHOP_DATE >= ? AND SHOP_DATE <= ?".to_string());
            params.push(a.min(b).clone());
            params.push(a.max(b).clone());
        }
        _ => bail!("please provide only one date, or two for a range"),
    }

    let sql = format!(
        "SELECT * FROM \"{table}\" WHERE {}",
        clauses.join(" AND ")
    );
    Ok((sql, params))
}

/// Run a built query and return every cell as text.
pub fn run(conn: &Connection, sql: &str, params: &[String]) -> Result<Vec<Vec<String>>> {
    let mut stmt = conn.prepare(sql)?;
    let width = stmt.column_count();
    let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            use rusqlite::types::ValueRef;
            let cell = match row.get_ref(i)? {
                ValueRef::Null => String::new(),
                ValueRef::Integer(v) => v.to_string(),
                ValueRef::Real(v) => v.to_string(),
                ValueRef::Text(v) => String::from_utf8_lossy(v).into_owned(),
                ValueRef::Blob(v) => format!("<{} bytes>", v.len()),
            };
            cells.push(cell);
        }
        out.push(cells);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE baskets (CUST_CODE TEXT, SHOP_DATE INTEGER, SPEND REAL);
             INSERT INTO baskets VALUES ('CUST001', 20080414, 1.50);
             INSERT INTO baskets VALUES ('CUST001', 20080421, 2.00);
             INSERT INTO baskets VALUES ('CUST002', 20080414, 9.99);
             INSERT INTO baskets VALUES ('CUST003', 20080505, 0.99);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn customer_in_list_matches_all_named() -> Result<()> {
        let conn = seeded();
        let criteria = Criteria {
            customers: vec!["CUST001".into(), "CUST003".into()],
            dates: vec![],
        };
        let (sql, params) = build("baskets", &criteria)?;
        assert_eq!(sql, "SELECT * FROM \"baskets\" WHERE CUST_CODE IN (?, ?)");
        assert_eq!(run(&conn, &sql, &params)?.len(), 3);
        Ok(())
    }

    #[test]
    fn date_range_is_inclusive_and_order_insensitive() -> Result<()> {
        let conn = seeded();
        let criteria = Criteria {
            customers: vec![],
            dates: vec!["20080421".into(), "20080414".into()],
        };
        let (sql, params) = build("baskets", &criteria)?;
        assert_eq!(params, vec!["20080414", "20080421"]);
        assert_eq!(run(&conn, &sql, &params)?.len(), 3);
        Ok(())
    }

    #[test]
    fn combined_filters_are_anded() -> Result<()> {
        let conn = seeded();
        let criteria = Criteria {
            customers: vec!["CUST001".into()],
            dates: vec!["20080414".into()],
        };
        let (sql, params) = build("baskets", &criteria)?;
        let rows = run(&conn, &sql, &params)?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], vec!["CUST001", "20080414", "1.5"]);
        Ok(())
    }

    #[test]
    fn empty_criteria_and_too_many_dates_error() {
        assert!(build("baskets", &Criteria::default()).is_err());
        let criteria = Criteria {
            customers: vec![],
            dates: vec!["1".into(), "2".into(), "3".into()],
        };
        assert!(build("baskets", &criteria).is_err());
    }

    #[test]
    fn hostile_values_stay_in_parameters() -> Result<()> {
        let conn = seeded();
        let criteria = Criteria {
            customers: vec!["x'; DROP TABLE baskets; --".into()],
            dates: vec![],
        };
        let (sql, params) = build("baskets", &criteria)?;
        assert!(!sql.contains("DROP"));
        assert_eq!(run(&conn, &sql, &params)?.len(), 0);
        // Table survives.
        assert_eq!(run(&conn, "SELECT * FROM \"baskets\" WHERE 1", &[])?.len(), 4);
        Ok(())
    }
}
