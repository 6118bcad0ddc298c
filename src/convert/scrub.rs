//! Repairs for scraped product text. The scraper's HTML flattening drops
//! the space after sentence punctuation ("best value.Apply daily"), which
//! wrecks downstream tokenization of the description fields.

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static MISSING_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.,:;])(\S)").expect("scrub regex"));

/// Insert the missing space after `.,:;` when glued to the next word.
/// Runs of punctuation need repeated passes (each pass consumes the
/// character it just spaced), so iterate to a fixpoint.
pub fn clean(dirty: &str) -> String {
    let mut text = dirty.to_string();
    loop {
        let next = MISSING_SPACE.replace_all(&text, "$1 $2").into_owned();
        if next == text {
            return text;
        }
        text = next;
    }
}

/// Apply [`clean`] to one named column of a CSV file, copying everything
/// else through unchanged.
pub fn clean_csv_field(input: &Path, output: &Path, field: &str) -> Result<usize> {
    let mut reader = csv::Reader::from_path(input)
        .with_context(|| format!("opening `{}`", input.display()))?;
    let headers = reader.headers().context("reading CSV header")?.clone();
    let idx = headers
        .iter()
        .position(|h| h == field)
        .with_context(|| format!("no column named `{field}` in `{}`", input.display()))?;

    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("creating `{}`", output.display()))?;
    writer.write_record(&headers)?;

    let mut cleaned = 0;
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("CSV parse error at row {row}"))?;
        let mut cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
        if cells.len() <= idx {
            bail!("row {row} has {} fields, expected at least {}", cells.len(), idx + 1);
        }
        let fixed = clean(&cells[idx]);
        if fixed != cells[idx] {
            cleaned += 1;
        }
        cells[idx] = fixed;
        writer.write_record(&cells)?;
    }
    writer.flush()?;
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn inserts_space_after_glued_punctuation() {
        assert_eq!(clean("best value.Apply daily"), "best value. Apply daily");
        assert_eq!(clean("a,b;c"), "a, b; c");
    }

    #[test]
    fn leaves_clean_text_alone() {
        assert_eq!(clean("already fine. Next sentence."), "already fine. Next sentence.");
        // Decimals get split too; the scrape fields are prose, not numbers.
        assert_eq!(clean("3.14"), "3. 14");
    }

    #[test]
    fn punctuation_runs_reach_fixpoint() {
        assert_eq!(clean("end.;start"), "end. ; start");
    }

    #[test]
    fn only_the_named_column_changes() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("scrape.csv");
        let output = dir.path().join("clean.csv");
        fs::write(
            &input,
            "PRODUCTID,DETAILS\n81999,value.Apply daily\n82000,nothing to fix\n",
        )?;
        let n = clean_csv_field(&input, &output, "DETAILS")?;
        assert_eq!(n, 1);
        let body = fs::read_to_string(&output)?;
        assert!(body.contains("value. Apply daily"));
        assert!(body.contains("81999"));
        Ok(())
    }

    #[test]
    fn unknown_column_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("scrape.csv");
        fs::write(&input, "A,B\n1,2\n")?;
        assert!(clean_csv_field(&input, &dir.path().join("out.csv"), "DETAILS").is_err());
        Ok(())
    }
}
