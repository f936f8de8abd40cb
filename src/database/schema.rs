//! Database schema migrations

use anyhow::Result;
use sqlx::{Pool, Sqlite};

/// Run database migrations to create/update schema
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS media (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            media_type TEXT NOT NULL,
            url TEXT NOT NULL,
            size INTEGER NOT NULL DEFAULT 0,
            date_added INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_media_name_size ON media(name, size);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
