use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// 16-hex-char identifier derived from arbitrary text. Used to mint the
/// synthetic Tesco customer/basket ids, which only need to be stable and
/// collision-unlikely, not reversible.
pub fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// Resolve loader `-i` arguments to concrete files. Arguments containing a
/// wildcard are expanded with glob (the Dunnhumby dataset ships as dozens of
/// weekly CSVs and not every shell expands for you); plain paths pass
/// through untouched. An argument matching nothing is an error rather than a
/// silent no-op.
pub fn expand_inputs(args: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for arg in args {
        if arg.contains(['*', '?', '[']) {
            let before = files.len();
            for entry in glob::glob(arg).with_context(|| format!("bad glob pattern `{arg}`"))? {
                let path = entry.with_context(|| format!("reading glob match for `{arg}`"))?;
                if path.is_file() {
                    files.push(path);
                }
            }
            if files.len() == before {
                bail!("pattern `{arg}` matched no files");
            }
        } else {
            let path = PathBuf::from(arg);
            if !path.is_file() {
                bail!("input file `{arg}` does not exist");
            }
            files.push(path);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn short_hash_is_stable_and_16_chars() {
        let a = short_hash("2994 2018-06-21T13:15:00");
        let b = short_hash("2994 2018-06-21T13:15:00");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, short_hash("2994 2018-06-21T13:16:00"));
    }

    #[test]
    fn expand_inputs_globs_and_validates() -> Result<()> {
        let dir = tempdir()?;
        for name in ["w1.csv", "w2.csv", "notes.txt"] {
            fs::write(dir.path().join(name), "x")?;
        }
        let pattern = format!("{}/w*.csv", dir.path().display());
        let mut found = expand_inputs(&[pattern])?;
        found.sort();
        assert_eq!(found.len(), 2);

        let plain = dir.path().join("notes.txt").display().to_string();
        assert_eq!(expand_inputs(&[plain])?.len(), 1);

        assert!(expand_inputs(&["missing.csv".into()]).is_err());
        let none = format!("{}/z*.csv", dir.path().display());
        assert!(expand_inputs(&[none]).is_err());
        Ok(())
    }
}
