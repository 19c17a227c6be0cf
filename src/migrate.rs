use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Creates all tables if missing. Idempotent — safe to run on every start.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // One bookmark per fingerprint; status: 0=new, 1=failed, 2=completed
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bookmarks (
            fingerprint TEXT PRIMARY KEY,
            url TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            status INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Error ledger: the PRIMARY KEY plus INSERT OR IGNORE gives
    // first-observed-wins without a read-modify-write cycle.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS processing_errors (
            fingerprint TEXT PRIMARY KEY,
            url TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            kind TEXT NOT NULL,
            exception TEXT NOT NULL,
            detail TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notes (
            fingerprint TEXT PRIMARY KEY,
            url TEXT NOT NULL,
            markdown TEXT NOT NULL,
            filename TEXT NOT NULL,
            folder TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_bookmarks_status ON bookmarks(status)")
        .execute(pool)
        .await?;

    Ok(())
}
