use libsql::params;

use super::{EntityStore, row_to_user};
use crate::{
    error::CoreResult,
    model::{EntityId, User, format_timestamp},
};

impl EntityStore {
    /// Registration lives outside the core; this is how accounts land in the
    /// store (seeding, imports, tests).
    pub async fn insert_user(&self, user: &User) -> CoreResult<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO users (id, username, full_name, avatar_url, avatar_public_id, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    user.id.to_string(),
                    user.username.as_str(),
                    user.full_name.as_str(),
                    user.avatar.as_ref().map(|avatar| avatar.url.clone()),
                    user.avatar.as_ref().map(|avatar| avatar.public_id.clone()),
                    format_timestamp(user.created_at),
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn find_user(&self, id: EntityId) -> CoreResult<Option<User>> {
        let mut rows = self
            .conn
            .query(
                r#"
                SELECT id, username, full_name, avatar_url, avatar_public_id, created_at
                FROM users
                WHERE id = ?1
                "#,
                params![id.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn user_exists(&self, id: EntityId) -> CoreResult<bool> {
        let mut rows = self
            .conn
            .query("SELECT 1 FROM users WHERE id = ?1", params![id.to_string()])
            .await?;
        Ok(rows.next().await?.is_some())
    }

    /// Appends `video` to the user's history or, when already present, moves
    /// it to the front. The primary key on (user, video) keeps one row per
    /// pair. Unknown users are ignored. Returns `true` if a row was written.
    pub async fn record_watch(&self, user: EntityId, video: EntityId) -> CoreResult<bool> {
        let watched_at = format_timestamp(chrono::Utc::now());
        let written = self
            .conn
            .execute(
                r#"
                INSERT INTO watch_history (user_id, video_id, seq, watched_at)
                SELECT ?1, ?2,
                       (SELECT COALESCE(MAX(seq), 0) + 1 FROM watch_history WHERE user_id = ?1),
                       ?3
                WHERE EXISTS (SELECT 1 FROM users WHERE id = ?1)
                ON CONFLICT(user_id, video_id) DO UPDATE SET
                    seq = excluded.seq,
                    watched_at = excluded.watched_at
                "#,
                params![user.to_string(), video.to_string(), watched_at],
            )
            .await?;
        Ok(written > 0)
    }

    /// Video ids in the user's history, most recent first.
    pub async fn watch_history_ids(&self, user: EntityId) -> CoreResult<Vec<EntityId>> {
        let mut rows = self
            .conn
            .query(
                "SELECT video_id FROM watch_history WHERE user_id = ?1 ORDER BY seq DESC",
                params![user.to_string()],
            )
            .await?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(super::entity_id_at(&row, 0)?);
        }
        Ok(ids)
    }

    pub async fn delete_watch_entries_for_video(&self, video: EntityId) -> CoreResult<u64> {
        Ok(self
            .conn
            .execute(
                "DELETE FROM watch_history WHERE video_id = ?1",
                params![video.to_string()],
            )
            .await?)
    }
}
