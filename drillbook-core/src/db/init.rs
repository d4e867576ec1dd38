//! Database initialization
//!
//! Creates the database on first run and brings the collection tables up
//! idempotently. Documents are stored as JSON bodies next to their ID so
//! that the schema-tolerant decode in [`crate::schema`] owns every shape
//! question; only the fields the store queries by get SQL-side indexes.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL allows concurrent readers alongside one writer
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    // Short lock waits; the store layers bounded retry on top
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_courses_table(&pool).await?;
    create_lessons_table(&pool).await?;
    create_course_rudiments_table(&pool).await?;
    create_admins_table(&pool).await?;

    Ok(pool)
}

async fn create_courses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            doc_id TEXT PRIMARY KEY,
            data TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_lessons_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lessons (
            doc_id TEXT PRIMARY KEY,
            data TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Lessons are listed per course
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_lessons_course ON lessons(json_extract(data, '$.courseId'))",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_course_rudiments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS course_rudiments (
            course_id TEXT NOT NULL,
            doc_id TEXT NOT NULL,
            data TEXT NOT NULL,
            PRIMARY KEY (course_id, doc_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Role lookup consulted by the authorization check. The admin service only
/// reads this table; rows are provisioned operationally.
async fn create_admins_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admins (
            uid TEXT PRIMARY KEY,
            role TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
