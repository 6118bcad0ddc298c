//! Flattening Tesco Clubcard JSON exports into one CSV row per item.
//!
//! The export nests items inside transactions inside a `Purchase` list, and
//! carries no stable customer identifier at all. Each item row gets the
//! surrounding transaction's store id and timestamp plus two synthetic ids:
//! a customer id hashed from the first transaction's metadata (unique to
//! the export, stable across re-runs) and a basket id hashed from its own
//! transaction's metadata.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::util::short_hash;

/// CSV header, in the transaction-table column order.
pub const CSV_HEADER: [&str; 10] = [
    "customer_id",
    "basket_id",
    "time_stamp",
    "store_id",
    "product_name",
    "quantity",
    "channel",
    "weight_in_grams",
    "item_selling_price",
    "volume_in_litres",
];

/// One flattened item purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRow {
    pub customer_id: String,
    pub basket_id: String,
    pub time_stamp: String,
    pub store_id: String,
    pub product_name: String,
    pub quantity: String,
    pub channel: String,
    pub weight_in_grams: String,
    pub item_selling_price: String,
    pub volume_in_litres: String,
}

impl ItemRow {
    pub fn cells(&self) -> [&str; 10] {
        [
            &self.customer_id,
            &self.basket_id,
            &self.time_stamp,
            &self.store_id,
            &self.product_name,
            &self.quantity,
            &self.channel,
            &self.weight_in_grams,
            &self.item_selling_price,
            &self.volume_in_litres,
        ]
    }
}

/// A flattened export: the synthetic customer id plus every item row.
#[derive(Debug)]
pub struct FlattenedExport {
    pub customer_id: String,
    pub rows: Vec<ItemRow>,
}

fn field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn required_str<'a>(value: &'a Value, key: &str, what: &str) -> Result<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .with_context(|| format!("{what} is missing a string `{key}` field"))
}

/// Flatten the parsed export. Fails on a structurally empty export, since a
/// customer id cannot be minted without a first transaction.
pub fn flatten(export: &Value) -> Result<FlattenedExport> {
    let transactions = export
        .get("Purchase")
        .and_then(Value::as_array)
        .and_then(|outer| outer.first())
        .and_then(Value::as_array)
        .context("export has no Purchase[0] transaction list")?;

    let first = transactions
        .first()
        .context("export contains no transactions")?;
    let customer_id = short_hash(&format!(
        "{}{}",
        required_str(first, "storeId", "first transaction")?,
        required_str(first, "timeStamp", "first transaction")?,
    ));
    info!(%customer_id, "assigned hash as customer identifier");

    let mut rows = Vec::new();
    for (i, transaction) in transactions.iter().enumerate() {
        let store_id = required_str(transaction, "storeId", "transaction")?;
        let time_stamp = required_str(transaction, "timeStamp", "transaction")?;
        let basket_id = short_hash(&format!("{store_id}{time_stamp}"));

        let items = transaction
            .get("product")
            .and_then(Value::as_array)
            .with_context(|| format!("transaction {i} has no product list"))?;
        for item in items {
            rows.push(ItemRow {
                customer_id: customer_id.clone(),
                basket_id: basket_id.clone(),
                time_stamp: time_stamp.to_string(),
                store_id: store_id.to_string(),
                product_name: field(item, "name"),
                quantity: field(item, "quantity"),
                channel: field(item, "channel"),
                weight_in_grams: field(item, "weightInGrams"),
                item_selling_price: field(item, "itemSellingPrice"),
                volume_in_litres: field(item, "volumeInLitres"),
            });
        }
    }

    Ok(FlattenedExport { customer_id, rows })
}

/// Convert a JSON export file to its CSV sibling. With `output` unset the
/// file lands next to the input as `<name>.csv`. Returns the output path
/// and the number of item rows written.
pub fn json_to_csv(input: &Path, output: Option<&Path>) -> Result<(PathBuf, usize)> {
    let raw = fs::read_to_string(input)
        .with_context(|| format!("reading `{}`", input.display()))?;
    let parsed: Value = serde_json::from_str(&raw)
        .with_context(|| format!("`{}` is not valid JSON", input.display()))?;
    let flat = flatten(&parsed)?;
    if flat.rows.is_empty() {
        bail!("`{}` contains no purchase items", input.display());
    }

    let out_path = match output {
        Some(p) => p.to_path_buf(),
        None => {
            let name = input
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("clubcard.json");
            let csv_name = match name.strip_suffix(".json") {
                Some(stem) => format!("{stem}.csv"),
                None => format!("{name}.csv"),
            };
            input.with_file_name(csv_name)
        }
    };

    let mut writer = csv::Writer::from_path(&out_path)
        .with_context(|| format!("creating `{}`", out_path.display()))?;
    writer.write_record(CSV_HEADER)?;
    for row in &flat.rows {
        writer.write_record(row.cells())?;
    }
    writer.flush()?;

    Ok((out_path, flat.rows.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample_export() -> Value {
        json!({
            "Purchase": [[
                {
                    "storeId": "2994",
                    "timeStamp": "2018-06-21T13:15:00",
                    "product": [
                        {
                            "name": "Semi Skimmed Milk 2.272L",
                            "quantity": 1,
                            "channel": "instore",
                            "weightInGrams": "",
                            "itemSellingPrice": 1.09,
                            "volumeInLitres": "2.272"
                        },
                        {
                            "name": "White Bread 800g",
                            "quantity": 2,
                            "channel": "instore",
                            "weightInGrams": "800",
                            "itemSellingPrice": 0.95,
                            "volumeInLitres": null
                        }
                    ]
                },
                {
                    "storeId": "2994",
                    "timeStamp": "2018-06-28T09:02:00",
                    "product": [
                        {
                            "name": "Bananas Loose",
                            "quantity": 6,
                            "channel": "instore",
                            "itemSellingPrice": 0.78
                        }
                    ]
                }
            ]]
        })
    }

    #[test]
    fn flattens_one_row_per_item() {
        let flat = flatten(&sample_export()).unwrap();
        assert_eq!(flat.rows.len(), 3);
        // Same customer throughout, baskets split by transaction.
        assert!(flat.rows.iter().all(|r| r.customer_id == flat.customer_id));
        assert_eq!(flat.rows[0].basket_id, flat.rows[1].basket_id);
        assert_ne!(flat.rows[0].basket_id, flat.rows[2].basket_id);
        assert_eq!(flat.rows[0].product_name, "Semi Skimmed Milk 2.272L");
        assert_eq!(flat.rows[1].quantity, "2");
        // Missing and null item fields flatten to empty cells.
        assert_eq!(flat.rows[1].volume_in_litres, "");
        assert_eq!(flat.rows[2].weight_in_grams, "");
    }

    #[test]
    fn customer_id_is_stable_for_the_same_export() {
        let a = flatten(&sample_export()).unwrap();
        let b = flatten(&sample_export()).unwrap();
        assert_eq!(a.customer_id, b.customer_id);
        assert_eq!(a.customer_id.len(), 16);
    }

    #[test]
    fn empty_export_is_an_error() {
        let empty = json!({ "Purchase": [[]] });
        assert!(flatten(&empty).is_err());
        assert!(flatten(&json!({})).is_err());
    }

    #[test]
    fn json_file_converts_to_csv_sibling() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("clubcard_42.json");
        fs::write(&input, serde_json::to_string(&sample_export())?)?;

        let (out, rows) = json_to_csv(&input, None)?;
        assert_eq!(out.file_name().unwrap(), "clubcard_42.csv");
        assert_eq!(rows, 3);

        let body = fs::read_to_string(out)?;
        let mut lines = body.lines();
        assert_eq!(lines.next().unwrap(), CSV_HEADER.join(","));
        assert_eq!(lines.count(), 3);
        Ok(())
    }
}
