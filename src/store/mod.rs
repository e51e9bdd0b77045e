#![forbid(unsafe_code)]

//! Entity store backed by a local libsql (SQLite) database.
//!
//! There are deliberately no foreign keys between the tables: the graph is
//! kept consistent by the cascade and toggle logic, not by the database.

mod comments;
mod relations;
mod rows;
mod users;
mod videos;

use std::path::Path;

use anyhow::{Context, Result};
use libsql::{Builder, Connection};

pub use relations::Relation;
pub(crate) use rows::{
    VIDEO_COLUMN_COUNT, VIDEO_COLUMNS, entity_id_at, row_to_comment, row_to_owner_summary,
    row_to_user, row_to_video,
};

async fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;
        PRAGMA busy_timeout=5000;
        "#,
    )
    .await?;
    Ok(())
}

async fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL DEFAULT '',
            avatar_url TEXT,
            avatar_public_id TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS videos (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            video_url TEXT NOT NULL,
            video_public_id TEXT NOT NULL,
            thumbnail_url TEXT NOT NULL,
            thumbnail_public_id TEXT NOT NULL,
            duration REAL NOT NULL DEFAULT 0,
            views INTEGER NOT NULL DEFAULT 0,
            is_published INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_videos_owner ON videos(owner_id);
        CREATE INDEX IF NOT EXISTS idx_videos_published ON videos(is_published, created_at);

        CREATE TABLE IF NOT EXISTS comments (
            id TEXT PRIMARY KEY,
            video_id TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_comments_video ON comments(video_id);

        CREATE TABLE IF NOT EXISTS likes (
            id TEXT PRIMARY KEY,
            liked_by TEXT NOT NULL,
            target_kind TEXT NOT NULL,
            target_id TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_likes_pair
            ON likes(liked_by, target_kind, target_id);
        CREATE INDEX IF NOT EXISTS idx_likes_target ON likes(target_kind, target_id);

        CREATE TABLE IF NOT EXISTS subscriptions (
            id TEXT PRIMARY KEY,
            subscriber_id TEXT NOT NULL,
            channel_id TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_subscriptions_pair
            ON subscriptions(subscriber_id, channel_id);
        CREATE INDEX IF NOT EXISTS idx_subscriptions_channel ON subscriptions(channel_id);

        CREATE TABLE IF NOT EXISTS watch_history (
            user_id TEXT NOT NULL,
            video_id TEXT NOT NULL,
            seq INTEGER NOT NULL,
            watched_at TEXT NOT NULL,
            PRIMARY KEY (user_id, video_id)
        );

        CREATE INDEX IF NOT EXISTS idx_watch_history_recent ON watch_history(user_id, seq);
        "#,
    )
    .await?;
    Ok(())
}

/// Cloneable handle over one libsql connection. Every entity query lives in
/// the submodules as `impl EntityStore` blocks.
#[derive(Clone)]
pub struct EntityStore {
    conn: Connection,
}

impl EntityStore {
    /// Opens (and if necessary creates) the database file and ensures the
    /// schema exists.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating store directory {}", parent.display()))?;
            }
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .with_context(|| format!("opening entity store {}", path.display()))?;
        let conn = db.connect()?;
        configure_connection(&conn).await?;
        ensure_schema(&conn)
            .await
            .context("creating entity store schema")?;
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}
