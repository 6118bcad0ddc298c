use anyhow::{anyhow, Result};
use tokio_postgres::{Client, NoTls};
use tracing::error;

use crate::config::DbConfig;

pub mod copy;
pub mod render;
pub mod status;

/// Connect to Postgres and drive the connection on a background task.
/// A missing database gets a hint rather than a bare driver error, since
/// that is the first thing that goes wrong on a fresh machine.
pub async fn connect(cfg: &DbConfig) -> Result<Client> {
    let (client, connection) = tokio_postgres::connect(&cfg.conn_string(), NoTls)
        .await
        .map_err(|e| {
            if e.to_string().contains("does not exist") {
                anyhow!(
                    "database `{db}` not found; create it first with: createdb {db}",
                    db = cfg.database
                )
            } else {
                anyhow!("connecting to Postgres at {}:{}: {e}", cfg.host, cfg.port)
            }
        })?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("postgres connection error: {e}");
        }
    });

    Ok(client)
}
