use chrono::{DateTime, Utc};
use libsql::params;

use super::{EntityStore, VIDEO_COLUMNS, row_to_video};
use crate::{
    error::CoreResult,
    model::{AssetRef, EntityId, Video, format_timestamp},
};

impl EntityStore {
    pub async fn insert_video(&self, video: &Video) -> CoreResult<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO videos (
                    id, owner_id, title, description,
                    video_url, video_public_id, thumbnail_url, thumbnail_public_id,
                    duration, views, is_published, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
                params![
                    video.id.to_string(),
                    video.owner.to_string(),
                    video.title.as_str(),
                    video.description.as_str(),
                    video.video_file.url.as_str(),
                    video.video_file.public_id.as_str(),
                    video.thumbnail.url.as_str(),
                    video.thumbnail.public_id.as_str(),
                    video.duration,
                    video.views,
                    video.is_published as i64,
                    format_timestamp(video.created_at),
                    format_timestamp(video.updated_at),
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn find_video(&self, id: EntityId) -> CoreResult<Option<Video>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {VIDEO_COLUMNS} FROM videos v WHERE v.id = ?1"),
                params![id.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_video(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn video_exists(&self, id: EntityId) -> CoreResult<bool> {
        let mut rows = self
            .conn
            .query("SELECT 1 FROM videos WHERE id = ?1", params![id.to_string()])
            .await?;
        Ok(rows.next().await?.is_some())
    }

    /// Rewrites title/description and, when given, the thumbnail reference.
    /// Returns the number of rows touched (0 when the video vanished).
    pub async fn update_video_details(
        &self,
        id: EntityId,
        title: &str,
        description: &str,
        thumbnail: Option<&AssetRef>,
        updated_at: DateTime<Utc>,
    ) -> CoreResult<u64> {
        let touched = match thumbnail {
            Some(thumbnail) => {
                self.conn
                    .execute(
                        r#"
                        UPDATE videos
                        SET title = ?2, description = ?3,
                            thumbnail_url = ?4, thumbnail_public_id = ?5,
                            updated_at = ?6
                        WHERE id = ?1
                        "#,
                        params![
                            id.to_string(),
                            title,
                            description,
                            thumbnail.url.as_str(),
                            thumbnail.public_id.as_str(),
                            format_timestamp(updated_at),
                        ],
                    )
                    .await?
            }
            None => {
                self.conn
                    .execute(
                        r#"
                        UPDATE videos
                        SET title = ?2, description = ?3, updated_at = ?4
                        WHERE id = ?1
                        "#,
                        params![
                            id.to_string(),
                            title,
                            description,
                            format_timestamp(updated_at),
                        ],
                    )
                    .await?
            }
        };
        Ok(touched)
    }

    /// Flips the publication flag in a single statement and returns the new
    /// value, or `None` when the video does not exist.
    pub async fn flip_published(&self, id: EntityId) -> CoreResult<Option<bool>> {
        let touched = self
            .conn
            .execute(
                r#"
                UPDATE videos
                SET is_published = 1 - is_published, updated_at = ?2
                WHERE id = ?1
                "#,
                params![id.to_string(), format_timestamp(Utc::now())],
            )
            .await?;
        if touched == 0 {
            return Ok(None);
        }
        let mut rows = self
            .conn
            .query(
                "SELECT is_published FROM videos WHERE id = ?1",
                params![id.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<i64>(0)? != 0)),
            None => Ok(None),
        }
    }

    /// Atomic `views + 1` at the store level. Returns `false` when no such
    /// video exists.
    pub async fn increment_views(&self, id: EntityId) -> CoreResult<bool> {
        let touched = self
            .conn
            .execute(
                "UPDATE videos SET views = views + 1 WHERE id = ?1",
                params![id.to_string()],
            )
            .await?;
        Ok(touched > 0)
    }

    pub async fn delete_video(&self, id: EntityId) -> CoreResult<u64> {
        Ok(self
            .conn
            .execute("DELETE FROM videos WHERE id = ?1", params![id.to_string()])
            .await?)
    }
}
