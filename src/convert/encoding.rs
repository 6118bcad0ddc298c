//! Boots card exports arrive as UTF-16 TSV; the tables want UTF-8 CSV.

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_16LE, UTF_8};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

/// Read a file as UTF-8, decoding from UTF-16 when the bytes say so.
/// Detection is BOM-first; BOM-less UTF-16LE (seen in the wild from Windows
/// exports) is caught by the NUL-byte density of ASCII-heavy text.
pub fn read_to_utf8(path: &Path) -> Result<(String, &'static Encoding)> {
    let bytes = fs::read(path).with_context(|| format!("reading `{}`", path.display()))?;
    let encoding = match Encoding::for_bom(&bytes) {
        Some((enc, _)) => enc,
        None => {
            let sample = &bytes[..bytes.len().min(1024)];
            let nuls = sample.iter().filter(|b| **b == 0).count();
            if nuls * 4 > sample.len() {
                UTF_16LE
            } else {
                UTF_8
            }
        }
    };
    let (text, _, had_errors) = encoding.decode(&bytes);
    if had_errors {
        anyhow::bail!(
            "`{}` does not decode cleanly as {}",
            path.display(),
            encoding.name()
        );
    }
    Ok((text.into_owned(), encoding))
}

/// Convert a card export to a UTF-8 CSV sibling (`<name>.utf-8.csv`),
/// turning tabs into commas on the way. Returns the new path. UTF-8 inputs
/// still get the tab normalization, so the loader always sees one shape.
pub fn normalize_card_export(input: &Path) -> Result<PathBuf> {
    let (text, encoding) = read_to_utf8(input)?;
    info!(file = %input.display(), encoding = encoding.name(), "normalizing card export");

    let name = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("card_export.csv");
    let out_name = match name.strip_suffix(".csv") {
        Some(stem) => format!("{stem}.utf-8.csv"),
        None => format!("{name}.utf-8.csv"),
    };
    let out_path = input.with_file_name(out_name);

    fs::write(&out_path, text.replace('\t', ","))
        .with_context(|| format!("writing `{}`", out_path.display()))?;
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn utf16le_with_bom(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn utf16_tsv_becomes_utf8_csv() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("card4374832.csv");
        fs::write(&input, utf16le_with_bom("ID\tDATE2\n0042\t2018-06-21\n"))?;

        let out = normalize_card_export(&input)?;
        assert_eq!(out.file_name().unwrap(), "card4374832.utf-8.csv");
        assert_eq!(fs::read_to_string(out)?, "ID,DATE2\n0042,2018-06-21\n");
        Ok(())
    }

    #[test]
    fn bomless_utf16le_is_detected() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("card.csv");
        let bytes: Vec<u8> = "ID\tSTORE\n".encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        fs::write(&input, bytes)?;

        let (text, encoding) = read_to_utf8(&input)?;
        assert_eq!(encoding, UTF_16LE);
        assert_eq!(text, "ID\tSTORE\n");
        Ok(())
    }

    #[test]
    fn utf8_passes_through_with_tab_normalization() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("plain.csv");
        fs::write(&input, "a\tb\n1\t2\n")?;
        let out = normalize_card_export(&input)?;
        assert_eq!(fs::read_to_string(out)?, "a,b\n1,2\n");
        Ok(())
    }
}
