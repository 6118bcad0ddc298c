use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

/// Connection and table-name settings, read from a `db.yaml` next to the
/// working directory (or wherever `TRANSEPI_DB_CONFIG` points). Every field
/// has a default matching a stock local Postgres, so the file is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub tables: TableNames,
}

/// The default table names. Renaming a dataset's table is a config edit,
/// not a code change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub boots_transactions: String,
    pub boots_products: String,
    pub tesco_transactions: String,
    pub tesco_products: String,
    pub dunn_humby: String,
    pub food_products: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            host: "127.0.0.1".into(),
            port: 5432,
            user: "postgres".into(),
            password: "password".into(),
            database: "te_db".into(),
            tables: TableNames::default(),
        }
    }
}

impl Default for TableNames {
    fn default() -> Self {
        TableNames {
            boots_transactions: "boots_transactions".into(),
            boots_products: "boots_products".into(),
            tesco_transactions: "tesco_transactions".into(),
            tesco_products: "tesco_products".into(),
            dunn_humby: "dunn_humby".into(),
            food_products: "food_products".into(),
        }
    }
}

impl DbConfig {
    /// Load config, in precedence order: explicit path, `TRANSEPI_DB_CONFIG`,
    /// `./db.yaml`, built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            return Self::from_file(p);
        }
        if let Ok(p) = env::var("TRANSEPI_DB_CONFIG") {
            return Self::from_file(Path::new(&p));
        }
        let local = Path::new("db.yaml");
        if local.exists() {
            return Self::from_file(local);
        }
        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config file `{}`", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing config file `{}`", path.display()))
    }

    /// Keyword/value string for tokio-postgres.
    pub fn conn_string(&self) -> String {
        format!(
            "host={} port={} user={} password={} dbname={}",
            self.host, self.port, self.user, self.password, self.database
        )
    }

    /// Same settings pointed at a different database.
    pub fn with_database(&self, database: &str) -> Self {
        let mut cfg = self.clone();
        cfg.database = database.to_string();
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_point_at_local_te_db() {
        let cfg = DbConfig::default();
        assert_eq!(cfg.database, "te_db");
        assert_eq!(
            cfg.conn_string(),
            "host=127.0.0.1 port=5432 user=postgres password=password dbname=te_db"
        );
    }

    #[test]
    fn partial_yaml_keeps_defaults_for_the_rest() -> anyhow::Result<()> {
        let mut f = NamedTempFile::new()?;
        writeln!(f, "user: at9362\ndatabase: cards")?;
        let cfg = DbConfig::from_file(f.path())?;
        assert_eq!(cfg.user, "at9362");
        assert_eq!(cfg.database, "cards");
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.tables.dunn_humby, "dunn_humby");
        Ok(())
    }

    #[test]
    fn with_database_only_changes_dbname() {
        let cfg = DbConfig::default().with_database("scrapes");
        assert_eq!(cfg.database, "scrapes");
        assert_eq!(cfg.user, "postgres");
    }
}
