//! Database module for SQLite persistence.
//!
//! SQLite is the content store for every collection. Each collection is a table;
//! list-valued fields are JSON text columns, and an article's like set is the
//! `article_likes` membership table.

mod articles;
mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path, timeout: Duration) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(timeout)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL COLLATE NOCASE UNIQUE,
            slug TEXT NOT NULL UNIQUE,
            description TEXT,
            article_count INTEGER NOT NULL DEFAULT 0 CHECK (article_count >= 0),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS articles (
            id TEXT PRIMARY KEY,
            category TEXT NOT NULL,
            avatar_url TEXT NOT NULL,
            avatar_asset_ref TEXT NOT NULL,
            image_url TEXT NOT NULL,
            image_asset_ref TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            slug TEXT NOT NULL UNIQUE,
            views INTEGER NOT NULL DEFAULT 0 CHECK (views >= 0),
            likes INTEGER NOT NULL DEFAULT 0 CHECK (likes >= 0),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS article_likes (
            article_id TEXT NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
            identity TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (article_id, identity)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id TEXT PRIMARY KEY,
            article_id TEXT NOT NULL,
            user TEXT NOT NULL,
            text TEXT NOT NULL,
            likes INTEGER NOT NULL DEFAULT 0 CHECK (likes >= 0),
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            full_description TEXT NOT NULL,
            image_url TEXT NOT NULL,
            category TEXT NOT NULL,
            technologies TEXT NOT NULL DEFAULT '[]',
            github TEXT,
            demo TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_articles_category ON articles(category COLLATE NOCASE);
        CREATE INDEX IF NOT EXISTS idx_articles_created_at ON articles(created_at);
        CREATE INDEX IF NOT EXISTS idx_articles_views ON articles(views);
        CREATE INDEX IF NOT EXISTS idx_comments_article_id ON comments(article_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_projects_category ON projects(category COLLATE NOCASE);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
