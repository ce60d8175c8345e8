//! Database access for breathe-rv
//!
//! SQLite report repository shared by the verification pipeline and the
//! lifecycle state machine.

pub mod reports;

use breathe_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Connects to the report database under the root folder, creating the file
/// and schema on first run.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the reports table and its hash index if they don't exist.
///
/// The UNIQUE index on image_hash is load-bearing: it is what turns a
/// lookup-then-insert race between two owners of the same image into a
/// constraint violation instead of a second row.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT,
            user_name TEXT,
            description TEXT NOT NULL,
            image_filename TEXT,
            image_hash TEXT NOT NULL,
            lat REAL NOT NULL,
            lng REAL NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            pollution_confidence REAL NOT NULL DEFAULT 0.0,
            description_match_confidence REAL NOT NULL DEFAULT 0.0,
            details TEXT NOT NULL DEFAULT '{}',
            precautions TEXT,
            govt_action TEXT,
            awarded_credits INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            last_checked_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_reports_image_hash ON reports(image_hash)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (reports)");

    Ok(())
}
