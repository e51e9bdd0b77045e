#![forbid(unsafe_code)]

//! Single-video view enriched with owner and viewer-relative engagement.

use chrono::{DateTime, Utc};
use libsql::params;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    engine::Engine,
    error::{CoreError, CoreResult},
    model::{AssetRef, EntityId},
    store::{VIDEO_COLUMN_COUNT, VIDEO_COLUMNS, entity_id_at, row_to_video},
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub id: EntityId,
    pub username: String,
    pub full_name: String,
    pub avatar: Option<String>,
    pub subscriber_count: i64,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetail {
    pub id: EntityId,
    pub title: String,
    pub description: String,
    pub video_file: AssetRef,
    pub thumbnail: AssetRef,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner: ChannelProfile,
    pub like_count: i64,
    pub is_liked: bool,
}

// ?1 = video id, ?2 = viewer id.
const DETAIL_SQL_TAIL: &str = r#"
    u.id, u.username, u.full_name, u.avatar_url,
    (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = v.owner_id),
    EXISTS (
        SELECT 1 FROM subscriptions s
        WHERE s.channel_id = v.owner_id AND s.subscriber_id = ?2
    ),
    (SELECT COUNT(*) FROM likes l WHERE l.target_kind = 'video' AND l.target_id = v.id),
    EXISTS (
        SELECT 1 FROM likes l
        WHERE l.target_kind = 'video' AND l.target_id = v.id AND l.liked_by = ?2
    )
    FROM videos v
    JOIN users u ON u.id = v.owner_id
    WHERE v.id = ?1
"#;

impl Engine {
    /// Reads the detail view in one query, then counts the view and records
    /// it in the viewer's watch history.
    pub async fn get_video_detail(&self, video_id: &str, viewer_id: &str) -> CoreResult<VideoDetail> {
        let video_id = EntityId::parse(video_id, "videoId")?;
        let viewer = EntityId::parse(viewer_id, "userId")?;

        let mut detail = self
            .read_video_detail(video_id, viewer)
            .await?
            .ok_or_else(|| CoreError::NotFound("video not found".into()))?;

        let store = self.store();
        if !store.increment_views(video_id).await? {
            return Err(CoreError::NotFound("video not found".into()));
        }
        detail.views += 1;
        if !store.record_watch(viewer, video_id).await? {
            debug!(%viewer, "viewer has no user record; history not written");
        }
        info!(video = %video_id, %viewer, views = detail.views, "video viewed");
        Ok(detail)
    }

    async fn read_video_detail(
        &self,
        video_id: EntityId,
        viewer: EntityId,
    ) -> CoreResult<Option<VideoDetail>> {
        let sql = format!("SELECT {VIDEO_COLUMNS}, {DETAIL_SQL_TAIL}");
        let mut rows = self
            .store()
            .conn()
            .query(&sql, params![video_id.to_string(), viewer.to_string()])
            .await?;
        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let video = row_to_video(&row)?;
        let base = VIDEO_COLUMN_COUNT;
        let owner = ChannelProfile {
            id: entity_id_at(&row, base)?,
            username: row.get(base + 1)?,
            full_name: row.get(base + 2)?,
            avatar: row.get(base + 3)?,
            subscriber_count: row.get(base + 4)?,
            is_subscribed: row.get::<i64>(base + 5)? != 0,
        };
        Ok(Some(VideoDetail {
            id: video.id,
            title: video.title,
            description: video.description,
            video_file: video.video_file,
            thumbnail: video.thumbnail,
            duration: video.duration,
            views: video.views,
            is_published: video.is_published,
            created_at: video.created_at,
            updated_at: video.updated_at,
            owner,
            like_count: row.get(base + 6)?,
            is_liked: row.get::<i64>(base + 7)? != 0,
        }))
    }
}
