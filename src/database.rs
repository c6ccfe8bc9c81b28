/// SQLite connection setup for slot storage
///
/// Opens the pool every slot operation runs on. Foreign keys are always
/// enforced so the reference table cascades when a host or a slot row is deleted.

use crate::config::DatabaseConfig;
use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Open the configured database
///
/// In-memory URLs get a single long-lived connection, otherwise every pooled
/// connection would see its own empty database.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool> {
    match &config.url {
        Some(url) if is_memory_url(url) => {
            let options = SqliteConnectOptions::from_str(url)?.foreign_keys(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?;

            tracing::info!("🗄️ Opened in-memory slot database");
            Ok(pool)
        }
        Some(url) => {
            let options = SqliteConnectOptions::from_str(url)?
                .create_if_missing(true)
                .foreign_keys(true);
            let pool = SqlitePool::connect_with(options).await?;

            tracing::info!("🗄️ Opened slot database: {}", url);
            Ok(pool)
        }
        None => {
            std::fs::create_dir_all(&config.data_dir).map_err(|e| {
                anyhow::anyhow!("Failed to create data directory '{}': {}", config.data_dir, e)
            })?;
            let db_path = config.file_path();

            let options = SqliteConnectOptions::new()
                .filename(&db_path)
                .create_if_missing(true)
                .foreign_keys(true);
            let pool = SqlitePool::connect_with(options).await?;

            tracing::info!("🗄️ Opened slot database: {}", db_path.display());
            Ok(pool)
        }
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_urls() {
        assert!(is_memory_url("sqlite::memory:"));
        assert!(is_memory_url("sqlite:file:slots?mode=memory&cache=shared"));
        assert!(!is_memory_url("sqlite://data/slots.db"));
    }

    #[tokio::test]
    async fn creates_database_file_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            data_dir: dir.path().join("nested").to_string_lossy().into_owned(),
            file_name: "slots.db".to_string(),
            url: None,
        };

        let pool = connect(&config).await.unwrap();
        let (fk,): (i64,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(fk, 1);
        assert!(config.file_path().exists());
    }
}
