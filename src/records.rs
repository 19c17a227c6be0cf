//! Record-store operations over bookmarks, the error ledger, and persisted
//! notes.
//!
//! Creation uses `INSERT OR IGNORE` so "already exists" is an explicit
//! branch on `rows_affected`, not an exception path. The error ledger is
//! append-only with first-observed-wins semantics.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{now_ts, Bookmark, BookmarkStatus, Note, ProcessingError};

fn row_to_bookmark(row: SqliteRow) -> Bookmark {
    Bookmark {
        fingerprint: row.get("fingerprint"),
        url: row.get("url"),
        title: row.get("title"),
        status: BookmarkStatus::from_i64(row.get("status")),
        created_at: row.get("created_at"),
    }
}

/// Inserts a new bookmark in status `New` unless one already exists for
/// this fingerprint. Returns `true` if the row was created.
pub async fn create_bookmark(
    pool: &SqlitePool,
    fingerprint: &str,
    url: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO bookmarks (fingerprint, url, title, status, created_at) \
         VALUES (?, ?, '', 0, ?)",
    )
    .bind(fingerprint)
    .bind(url)
    .bind(now_ts())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn find_bookmark(
    pool: &SqlitePool,
    fingerprint: &str,
) -> Result<Option<Bookmark>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT fingerprint, url, title, status, created_at FROM bookmarks WHERE fingerprint = ?",
    )
    .bind(fingerprint)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(row_to_bookmark))
}

pub async fn mark_completed(
    pool: &SqlitePool,
    fingerprint: &str,
    title: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE bookmarks SET status = ?, title = ? WHERE fingerprint = ?")
        .bind(BookmarkStatus::Completed.as_i64())
        .bind(title)
        .bind(fingerprint)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_failed(pool: &SqlitePool, fingerprint: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE bookmarks SET status = ? WHERE fingerprint = ?")
        .bind(BookmarkStatus::Failed.as_i64())
        .bind(fingerprint)
        .execute(pool)
        .await?;
    Ok(())
}

/// Explicit reprocess resets the status to `New`.
pub async fn reset_to_new(pool: &SqlitePool, fingerprint: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE bookmarks SET status = ? WHERE fingerprint = ?")
        .bind(BookmarkStatus::New.as_i64())
        .bind(fingerprint)
        .execute(pool)
        .await?;
    Ok(())
}

/// Best-effort ledger insert. If a record already exists for this
/// fingerprint the insert is a no-op — the first failure is preserved.
pub async fn record_error(pool: &SqlitePool, error: &ProcessingError) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT OR IGNORE INTO processing_errors \
         (fingerprint, url, title, kind, exception, detail, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&error.fingerprint)
    .bind(&error.url)
    .bind(&error.title)
    .bind(&error.kind)
    .bind(&error.exception)
    .bind(&error.detail)
    .bind(error.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_error(
    pool: &SqlitePool,
    fingerprint: &str,
) -> Result<Option<ProcessingError>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT fingerprint, url, title, kind, exception, detail, created_at \
         FROM processing_errors WHERE fingerprint = ?",
    )
    .bind(fingerprint)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| ProcessingError {
        fingerprint: row.get("fingerprint"),
        url: row.get("url"),
        title: row.get("title"),
        kind: row.get("kind"),
        exception: row.get("exception"),
        detail: row.get("detail"),
        created_at: row.get("created_at"),
    }))
}

pub async fn count_errors(pool: &SqlitePool, fingerprint: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM processing_errors WHERE fingerprint = ?")
        .bind(fingerprint)
        .fetch_one(pool)
        .await
}

pub async fn upsert_note(pool: &SqlitePool, note: &Note) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO notes (fingerprint, url, markdown, filename, folder, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(fingerprint) DO UPDATE SET
            url = excluded.url,
            markdown = excluded.markdown,
            filename = excluded.filename,
            folder = excluded.folder
        "#,
    )
    .bind(&note.fingerprint)
    .bind(&note.url)
    .bind(&note.markdown)
    .bind(&note.filename)
    .bind(&note.folder)
    .bind(note.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_note(pool: &SqlitePool, fingerprint: &str) -> Result<Option<Note>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT fingerprint, url, markdown, filename, folder, created_at \
         FROM notes WHERE fingerprint = ?",
    )
    .bind(fingerprint)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Note {
        fingerprint: row.get("fingerprint"),
        url: row.get("url"),
        markdown: row.get("markdown"),
        filename: row.get("filename"),
        folder: row.get("folder"),
        created_at: row.get("created_at"),
    }))
}
