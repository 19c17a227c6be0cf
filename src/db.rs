//! SQLite connection handling for the record store.
//!
//! The store is single-writer by design: one bookmark run updates records
//! at a time, so the pool holds exactly one connection and writes can never
//! interleave. WAL mode plus a busy timeout covers the case of a second
//! `lnk` process (watcher and server running side by side) touching the
//! same database file.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use crate::config::Config;

pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    // The configured path is typically nested (data/linknote.sqlite).
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn creates_nested_path_and_uses_wal() {
        let tmp = TempDir::new().unwrap();
        let config: Config = toml::from_str(&format!(
            r#"
            [db]
            path = "{root}/nested/dir/linknote.sqlite"

            [storage]
            cache_dir = "{root}/cache"
            notes_dir = "{root}/notes"
            "#,
            root = tmp.path().display()
        ))
        .unwrap();

        let pool = connect(&config).await.unwrap();
        assert!(tmp.path().join("nested/dir/linknote.sqlite").is_file());

        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
