//! Filter-query planning for the transaction tables.
//!
//! A querier maps its CLI flags onto a [`QueryPlan`]: a projection, an
//! optional product-table join, and the ANDed predicates for whichever of
//! the optional filters were supplied. The plan renders to one SQL statement
//! with numbered placeholders; user values only ever travel as bound
//! parameters.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tokio_postgres::types::ToSql;

/// What the SELECT projects: raw rows, a record count, or total spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Rows,
    Count,
    Spend,
}

impl Projection {
    /// Resolve `--count` / `--spend` flags. Both at once is a user error.
    pub fn from_flags(count: bool, spend: bool) -> Result<Self> {
        match (count, spend) {
            (true, true) => bail!("please provide just one record type (count or spend)"),
            (true, false) => Ok(Projection::Count),
            (false, true) => Ok(Projection::Spend),
            (false, false) => Ok(Projection::Rows),
        }
    }

    fn select_list(&self, spend_column: &str) -> String {
        match self {
            Projection::Rows => "*".to_string(),
            Projection::Count => "COUNT(*)".to_string(),
            Projection::Spend => format!("SUM({spend_column})"),
        }
    }
}

/// One WHERE predicate. Each holds its own bound value(s); the column name
/// is compiled in by the querier binary, never user input.
#[derive(Debug)]
pub enum Predicate {
    TextEq { column: &'static str, value: String },
    IntEq { column: &'static str, value: i32 },
    DateEq { column: &'static str, value: NaiveDate },
    /// Inclusive range; construction normalizes the endpoints.
    DateRange {
        column: &'static str,
        start: NaiveDate,
        end: NaiveDate,
    },
    IntRange {
        column: &'static str,
        start: i32,
        end: i32,
    },
    /// Substring match; the LIKE pattern is part of the bound value.
    Contains { column: &'static str, pattern: String },
}

impl Predicate {
    pub fn text_eq(column: &'static str, value: &str) -> Self {
        Predicate::TextEq { column, value: value.to_string() }
    }

    pub fn int_eq(column: &'static str, value: i32) -> Self {
        Predicate::IntEq { column, value }
    }

    pub fn contains(column: &'static str, value: &str) -> Self {
        Predicate::Contains { column, pattern: format!("%{value}%") }
    }

    /// One date → equality, two dates (either order) → inclusive range.
    pub fn dates(column: &'static str, dates: &[NaiveDate]) -> Result<Self> {
        match dates {
            [d] => Ok(Predicate::DateEq { column, value: *d }),
            [a, b] => Ok(Predicate::DateRange {
                column,
                start: *a.min(b),
                end: *a.max(b),
            }),
            _ => bail!("please provide one date, or two for a range"),
        }
    }

    /// Same as [`Predicate::dates`] for tables keeping dates as YYYYMMDD ints.
    pub fn int_dates(column: &'static str, dates: &[i32]) -> Result<Self> {
        match dates {
            [d] => Ok(Predicate::IntEq { column, value: *d }),
            [a, b] => Ok(Predicate::IntRange {
                column,
                start: *a.min(b),
                end: *a.max(b),
            }),
            _ => bail!("please provide one date, or two for a range"),
        }
    }

    fn column(&self) -> &'static str {
        match self {
            Predicate::TextEq { column, .. }
            | Predicate::IntEq { column, .. }
            | Predicate::DateEq { column, .. }
            | Predicate::DateRange { column, .. }
            | Predicate::IntRange { column, .. }
            | Predicate::Contains { column, .. } => column,
        }
    }
}

/// LEFT JOIN of the transaction table onto a product table over the shared
/// product-code column.
#[derive(Debug, Clone)]
pub struct ProductJoin {
    pub product_table: String,
    pub transaction_column: &'static str,
    pub product_column: &'static str,
}

/// A complete, renderable query.
#[derive(Debug)]
pub struct QueryPlan {
    table: String,
    projection: Projection,
    spend_column: &'static str,
    join: Option<ProductJoin>,
    predicates: Vec<Predicate>,
}

impl QueryPlan {
    pub fn new(table: &str, projection: Projection, spend_column: &'static str) -> Self {
        QueryPlan {
            table: table.to_string(),
            projection,
            spend_column,
            join: None,
            predicates: Vec::new(),
        }
    }

    pub fn join(mut self, join: ProductJoin) -> Self {
        self.join = Some(join);
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Add the predicate if the flag was supplied.
    pub fn filter_opt(self, predicate: Option<Predicate>) -> Self {
        match predicate {
            Some(p) => self.filter(p),
            None => self,
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Render to SQL with `$n` placeholders, one per bound value.
    pub fn sql(&self) -> String {
        let mut sql = format!(
            "SELECT {} FROM {}",
            self.projection.select_list(self.spend_column),
            self.table
        );
        if let Some(join) = &self.join {
            sql.push_str(&format!(
                " LEFT JOIN {} ON {}.{} = {}.{}",
                join.product_table,
                self.table,
                join.transaction_column,
                join.product_table,
                join.product_column
            ));
        }
        let mut n = 0;
        for (i, pred) in self.predicates.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            let clause = match pred {
                Predicate::TextEq { .. } | Predicate::IntEq { .. } | Predicate::DateEq { .. } => {
                    n += 1;
                    format!("{} = ${}", pred.column(), n)
                }
                Predicate::DateRange { .. } | Predicate::IntRange { .. } => {
                    n += 2;
                    format!("{col} >= ${} AND {col} <= ${}", n - 1, n, col = pred.column())
                }
                Predicate::Contains { .. } => {
                    n += 1;
                    format!("{} LIKE ${}", pred.column(), n)
                }
            };
            sql.push_str(&clause);
        }
        sql
    }

    /// Bound values, in placeholder order. Borrows from the plan, so the
    /// plan must outlive the query call.
    pub fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        let mut out: Vec<&(dyn ToSql + Sync)> = Vec::new();
        for pred in &self.predicates {
            match pred {
                Predicate::TextEq { value, .. } => out.push(value),
                Predicate::IntEq { value, .. } => out.push(value),
                Predicate::DateEq { value, .. } => out.push(value),
                Predicate::DateRange { start, end, .. } => {
                    out.push(start);
                    out.push(end);
                }
                Predicate::IntRange { start, end, .. } => {
                    out.push(start);
                    out.push(end);
                }
                Predicate::Contains { pattern, .. } => out.push(pattern),
            }
        }
        out
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }
}

/// Parse a `--date` argument in the export format (YYYYMMDD).
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .with_context(|| format!("date `{raw}` is not in YYYYMMDD format"))
}

/// Parse the same argument for tables that keep dates as raw YYYYMMDD ints;
/// still validated as a real calendar date first.
pub fn parse_date_int(raw: &str) -> Result<i32> {
    parse_date(raw)?;
    raw.parse::<i32>()
        .with_context(|| format!("date `{raw}` does not fit an integer column"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y%m%d").unwrap()
    }

    #[test]
    fn bare_customer_query() {
        let plan = QueryPlan::new("boots_transactions", Projection::Rows, "SPEND")
            .filter(Predicate::text_eq("ID", "9874786793"));
        assert_eq!(
            plan.sql(),
            "SELECT * FROM boots_transactions WHERE ID = $1"
        );
        assert_eq!(plan.params().len(), 1);
    }

    #[test]
    fn four_filters_with_join_and_count() {
        let plan = QueryPlan::new("boots_transactions", Projection::Count, "SPEND")
            .join(ProductJoin {
                product_table: "boots_products".into(),
                transaction_column: "ITEM_CODE",
                product_column: "PRODUCTID",
            })
            .filter(Predicate::text_eq("ID", "9874786793"))
            .filter(Predicate::text_eq("ITEM_CODE", "8199922"))
            .filter(Predicate::dates("DATE2", &[date("20180621"), date("20180601")]).unwrap())
            .filter(Predicate::contains("STORE", "NOTTINGHAM"));
        assert_eq!(
            plan.sql(),
            "SELECT COUNT(*) FROM boots_transactions \
             LEFT JOIN boots_products ON boots_transactions.ITEM_CODE = boots_products.PRODUCTID \
             WHERE ID = $1 AND ITEM_CODE = $2 AND DATE2 >= $3 AND DATE2 <= $4 AND STORE LIKE $5"
        );
        assert_eq!(plan.params().len(), 5);
    }

    #[test]
    fn date_range_normalizes_endpoint_order() {
        let pred = Predicate::dates("DATE2", &[date("20181231"), date("20180101")]).unwrap();
        match pred {
            Predicate::DateRange { start, end, .. } => {
                assert!(start < end);
            }
            other => panic!("expected range, got {other:?}"),
        }
    }

    #[test]
    fn three_dates_is_an_error() {
        let ds = [date("20180101"), date("20180102"), date("20180103")];
        assert!(Predicate::dates("DATE2", &ds).is_err());
    }

    #[test]
    fn spend_projection_names_the_spend_column() {
        let plan = QueryPlan::new("dunn_humby", Projection::Spend, "SPEND")
            .filter(Predicate::text_eq("CUST_CODE", "CUST0000001"))
            .filter(Predicate::int_dates("SHOP_DATE", &[20080414]).unwrap());
        assert_eq!(
            plan.sql(),
            "SELECT SUM(SPEND) FROM dunn_humby WHERE CUST_CODE = $1 AND SHOP_DATE = $2"
        );
    }

    #[test]
    fn contains_pattern_is_bound_not_spliced() {
        let plan = QueryPlan::new("boots_transactions", Projection::Rows, "SPEND")
            .filter(Predicate::contains("STORE", "x'; DROP TABLE t; --"));
        // The hostile text never reaches the SQL, only the parameter slot.
        assert!(!plan.sql().contains("DROP"));
        assert_eq!(plan.params().len(), 1);
    }

    #[test]
    fn count_and_spend_flags_conflict() {
        assert!(Projection::from_flags(true, true).is_err());
        assert_eq!(Projection::from_flags(false, false).unwrap(), Projection::Rows);
    }

    #[test]
    fn date_parsers_validate_calendar_dates() {
        assert!(parse_date("20180621").is_ok());
        assert!(parse_date("20181332").is_err());
        assert!(parse_date("2018-06-21").is_err());
        assert_eq!(parse_date_int("20080414").unwrap(), 20080414);
    }
}
