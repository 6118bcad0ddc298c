use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// A single column in a dataset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: &'static str,
}

/// A labelled `COUNT(DISTINCT col)` reported by the status summary.
#[derive(Debug, Clone, Copy)]
pub struct DistinctCount {
    pub label: &'static str,
    pub column: &'static str,
}

/// The fixed shape of one dataset table: DDL, COPY column order, optional
/// dedup key, and which distinct counts its status summary reports.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub columns: &'static [ColumnDef],
    /// Column carrying a UNIQUE constraint; loads for such tables stage
    /// first and insert with ON CONFLICT DO NOTHING.
    pub conflict_key: Option<&'static str>,
    pub summary: &'static [DistinctCount],
}

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"));

/// Table and column names are the one thing that cannot be bound as a query
/// parameter, so anything user-supplied is gated here before it reaches DDL
/// or a query string.
pub fn validate_identifier(name: &str) -> Result<&str> {
    if name.len() > 63 {
        bail!("identifier `{name}` is too long (63 bytes max)");
    }
    if !IDENTIFIER.is_match(name) {
        bail!(
            "identifier `{name}` is not allowed: letters, digits and underscore only, \
             and it must not start with a digit"
        );
    }
    Ok(name)
}

impl TableSpec {
    /// `CREATE TABLE IF NOT EXISTS` DDL for this shape under `table_name`.
    /// `with_unique` controls whether the conflict key gets its UNIQUE
    /// constraint; staging tables are created without it so raw rows land
    /// unchecked.
    pub fn create_sql(&self, table_name: &str, with_unique: bool) -> String {
        let cols: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                if with_unique && Some(c.name) == self.conflict_key {
                    format!("{} {} UNIQUE", c.name, c.sql_type)
                } else {
                    format!("{} {}", c.name, c.sql_type)
                }
            })
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {})",
            table_name,
            cols.join(",\n    ")
        )
    }

    /// Comma-separated column list, in COPY order.
    pub fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

macro_rules! cols {
    ($(($name:literal, $ty:literal)),+ $(,)?) => {
        &[$(ColumnDef { name: $name, sql_type: $ty }),+]
    };
}

/// Boots Advantage card export. Code-like fields stay VARCHAR so leading
/// zeros survive the round trip.
pub const BOOTS_CARD: TableSpec = TableSpec {
    columns: cols![
        ("ID", "VARCHAR"),
        ("DATE2", "DATE"),
        ("TIME3", "TIME"),
        ("STORE", "VARCHAR"),
        ("PAYMENT", "VARCHAR"),
        ("STAFF_DISCOUNT_CARD_NUMBER", "VARCHAR"),
        ("ITEM_CODE", "VARCHAR"),
        ("ITEM_DESCRIPTION", "VARCHAR"),
        ("POINTS_ADJUSTMENT", "INT"),
        ("POINTS_ITEM", "REAL"),
        ("UNITS", "INT"),
        ("SPEND", "DOUBLE PRECISION"),
        ("DISCOUNT", "REAL"),
    ],
    conflict_key: None,
    summary: &[
        DistinctCount { label: "Customer IDs", column: "ID" },
        DistinctCount { label: "Items", column: "ITEM_CODE" },
        DistinctCount { label: "Shop dates", column: "DATE2" },
    ],
};

/// Boots website scrape. PRICE stays VARCHAR: scraped values carry currency
/// symbols.
pub const BOOTS_SCRAPE: TableSpec = TableSpec {
    columns: cols![
        ("IDX1", "INT"),
        ("PRODUCT_LINK", "VARCHAR"),
        ("PRODUCTID", "INT"),
        ("NAME", "VARCHAR"),
        ("PRICE", "VARCHAR"),
        ("DETAILS", "VARCHAR"),
        ("LONG_DESCRIPTION", "VARCHAR"),
    ],
    conflict_key: Some("PRODUCTID"),
    summary: &[DistinctCount { label: "Products", column: "PRODUCTID" }],
};

/// Tesco Clubcard items, flattened from the JSON export by
/// `convert::tesco`.
pub const TESCO_CARD: TableSpec = TableSpec {
    columns: cols![
        ("customer_id", "VARCHAR"),
        ("basket_id", "VARCHAR"),
        ("time_stamp", "TIMESTAMP"),
        ("store_id", "INT"),
        ("product_name", "VARCHAR"),
        ("quantity", "INT"),
        ("channel", "VARCHAR"),
        ("weight_in_grams", "VARCHAR"),
        ("item_selling_price", "DOUBLE PRECISION"),
        ("volume_in_litres", "VARCHAR"),
    ],
    conflict_key: None,
    summary: &[
        DistinctCount { label: "Customer IDs", column: "customer_id" },
        DistinctCount { label: "Items", column: "product_name" },
        DistinctCount { label: "Shop dates", column: "time_stamp" },
    ],
};

/// Dunnhumby "Let's Get Sort-of-Real" weekly-basket records.
pub const DUNN_HUMBY: TableSpec = TableSpec {
    columns: cols![
        ("SHOP_WEEK", "INT"),
        ("SHOP_DATE", "INT"),
        ("SHOP_WEEKDAY", "INT"),
        ("SHOP_HOUR", "INT"),
        ("QUANTITY", "INT"),
        ("SPEND", "DOUBLE PRECISION"),
        ("PROD_CODE", "VARCHAR"),
        ("PROD_CODE_10", "VARCHAR"),
        ("PROD_CODE_20", "VARCHAR"),
        ("PROD_CODE_30", "VARCHAR"),
        ("PROD_CODE_40", "VARCHAR"),
        ("CUST_CODE", "VARCHAR"),
        ("CUST_PRICE_SENSITIVITY", "VARCHAR"),
        ("CUST_LIFESTAGE", "VARCHAR"),
        ("BASKET_ID", "VARCHAR"),
        ("BASKET_SIZE", "VARCHAR"),
        ("BASKET_PRICE_SENSITIVITY", "VARCHAR"),
        ("BASKET_TYPE", "TEXT"),
        ("BASKET_DOMINANT_MISSION", "TEXT"),
        ("STORE_CODE", "VARCHAR"),
        ("STORE_FORMAT", "VARCHAR"),
        ("STORE_REGION", "VARCHAR"),
    ],
    conflict_key: None,
    summary: &[
        DistinctCount { label: "Customers", column: "CUST_CODE" },
        DistinctCount { label: "Baskets", column: "BASKET_ID" },
        DistinctCount { label: "Shop dates", column: "SHOP_DATE" },
    ],
};

/// Food-product reference data: descriptions, per-serving and per-unit
/// nutrition, and the five-level category hierarchy.
pub const FOOD_PRODUCTS: TableSpec = TableSpec {
    columns: cols![
        ("x_id", "INT"),
        ("x_descr", "VARCHAR"),
        ("x_marketingdescr", "VARCHAR"),
        ("x_tilldescr", "VARCHAR"),
        ("x_friendlydescr", "VARCHAR"),
        ("x_productdescription", "VARCHAR"),
        ("x_brand", "VARCHAR"),
        ("x_ingredients", "VARCHAR"),
        ("x_energyserv", "DOUBLE PRECISION"),
        ("x_fatserv", "DOUBLE PRECISION"),
        ("x_saturatesserv", "DOUBLE PRECISION"),
        ("x_saltserv", "DOUBLE PRECISION"),
        ("x_sugarsserv", "DOUBLE PRECISION"),
        ("x_proteinserv", "DOUBLE PRECISION"),
        ("x_carbohydrateserv", "DOUBLE PRECISION"),
        ("x_fibreserv", "DOUBLE PRECISION"),
        ("x_energyunit", "DOUBLE PRECISION"),
        ("x_fatunit", "DOUBLE PRECISION"),
        ("x_saturatesunit", "DOUBLE PRECISION"),
        ("x_saltunit", "DOUBLE PRECISION"),
        ("x_sugarsunit", "DOUBLE PRECISION"),
        ("x_proteinunit", "DOUBLE PRECISION"),
        ("x_carbohydrateunit", "DOUBLE PRECISION"),
        ("x_fibreunit", "DOUBLE PRECISION"),
        ("x_allergens", "VARCHAR"),
        ("y_category_id", "VARCHAR"),
        ("l1y_division", "VARCHAR"),
        ("l2y_group", "VARCHAR"),
        ("l3y_department", "VARCHAR"),
        ("l4y_class", "VARCHAR"),
        ("l5y_subclass", "VARCHAR"),
    ],
    conflict_key: Some("x_id"),
    summary: &[
        DistinctCount { label: "Products", column: "x_id" },
        DistinctCount { label: "Classes", column: "l4y_class" },
        DistinctCount { label: "Departments", column: "l3y_department" },
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddl_marks_conflict_key_unique_only_when_asked() {
        let real = BOOTS_SCRAPE.create_sql("boots_products", true);
        assert!(real.contains("PRODUCTID INT UNIQUE"));
        let staging = BOOTS_SCRAPE.create_sql("boots_products_staging_1", false);
        assert!(staging.contains("PRODUCTID INT"));
        assert!(!staging.contains("UNIQUE"));
    }

    #[test]
    fn copy_column_list_keeps_declaration_order() {
        let list = BOOTS_CARD.column_list();
        assert!(list.starts_with("ID, DATE2, TIME3"));
        assert!(list.ends_with("SPEND, DISCOUNT"));
        assert_eq!(BOOTS_CARD.column_count(), 13);
        assert_eq!(DUNN_HUMBY.column_count(), 22);
        assert_eq!(FOOD_PRODUCTS.column_count(), 31);
    }

    #[test]
    fn identifier_gate_rejects_injection_shapes() {
        assert!(validate_identifier("dunn_humby").is_ok());
        assert!(validate_identifier("Table2").is_ok());
        assert!(validate_identifier("2table").is_err());
        assert!(validate_identifier("t; DROP TABLE x").is_err());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier(&"x".repeat(64)).is_err());
    }
}
