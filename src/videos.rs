#![forbid(unsafe_code)]

//! Owner-side video mutations: publish, edit, and flip visibility.

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    assets::AssetKind,
    engine::Engine,
    error::{CoreError, CoreResult},
    model::{AssetRef, EntityId, NewVideo, Video},
};

/// Editable fields. A `thumbnail` replaces the current one.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoUpdate {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: Option<AssetRef>,
}

fn required_text<'a>(value: &'a str, field: &str) -> CoreResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidArgument(format!("{field} is required")));
    }
    Ok(trimmed)
}

fn required_asset(asset: &AssetRef, field: &str) -> CoreResult<()> {
    if asset.url.trim().is_empty() || asset.public_id.trim().is_empty() {
        return Err(CoreError::InvalidArgument(format!("{field} is required")));
    }
    Ok(())
}

impl Engine {
    /// Creates an unpublished video from already uploaded assets.
    pub async fn publish_video(&self, owner_id: &str, input: NewVideo) -> CoreResult<Video> {
        let owner = EntityId::parse(owner_id, "userId")?;
        let title = required_text(&input.title, "title")?;
        let description = required_text(&input.description, "description")?;
        required_asset(&input.video_file, "videoFile")?;
        required_asset(&input.thumbnail, "thumbnail")?;
        if !input.duration.is_finite() || input.duration < 0.0 {
            return Err(CoreError::InvalidArgument(
                "duration must be a non-negative number".into(),
            ));
        }

        let store = self.store();
        if !store.user_exists(owner).await? {
            return Err(CoreError::NotFound("user not found".into()));
        }

        let now = Utc::now();
        let video = Video {
            id: EntityId::generate(),
            owner,
            title: title.to_string(),
            description: description.to_string(),
            video_file: input.video_file,
            thumbnail: input.thumbnail,
            duration: input.duration,
            views: 0,
            is_published: false,
            created_at: now,
            updated_at: now,
        };
        store.insert_video(&video).await?;
        let created = store
            .find_video(video.id)
            .await?
            .ok_or_else(|| CoreError::Internal("video missing right after creation".into()))?;
        info!(video = %created.id, %owner, "video created");
        Ok(created)
    }

    /// Rewrites title and description, and optionally the thumbnail. The
    /// replaced thumbnail asset is removed only once the new reference is
    /// stored.
    pub async fn update_video(
        &self,
        video_id: &str,
        actor_id: &str,
        update: VideoUpdate,
    ) -> CoreResult<Video> {
        let video_id = EntityId::parse(video_id, "videoId")?;
        let actor = EntityId::parse(actor_id, "userId")?;
        let title = required_text(&update.title, "title")?;
        let description = required_text(&update.description, "description")?;
        if let Some(thumbnail) = &update.thumbnail {
            required_asset(thumbnail, "thumbnail")?;
        }

        let existing = self.owned_video(video_id, actor, "edit").await?;
        let store = self.store();
        let touched = store
            .update_video_details(
                video_id,
                title,
                description,
                update.thumbnail.as_ref(),
                Utc::now(),
            )
            .await?;
        if touched == 0 {
            return Err(CoreError::NotFound("video not found".into()));
        }
        let updated = store
            .find_video(video_id)
            .await?
            .ok_or_else(|| CoreError::Internal("video missing right after update".into()))?;

        if update.thumbnail.is_some() && existing.thumbnail.public_id != updated.thumbnail.public_id {
            if let Err(err) = self
                .assets()
                .delete(&existing.thumbnail, AssetKind::Image)
                .await
            {
                warn!(
                    video = %video_id,
                    public_id = %existing.thumbnail.public_id,
                    error = %err,
                    "old thumbnail not removed"
                );
            }
        }
        info!(video = %video_id, "video updated");
        Ok(updated)
    }

    /// Flips the publication flag and returns the new value.
    pub async fn toggle_publish_status(&self, video_id: &str, actor_id: &str) -> CoreResult<bool> {
        let video_id = EntityId::parse(video_id, "videoId")?;
        let actor = EntityId::parse(actor_id, "userId")?;
        self.owned_video(video_id, actor, "publish").await?;
        let published = self
            .store()
            .flip_published(video_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("video not found".into()))?;
        info!(video = %video_id, published, "publication toggled");
        Ok(published)
    }

    async fn owned_video(&self, video_id: EntityId, actor: EntityId, action: &str) -> CoreResult<Video> {
        let video = self
            .store()
            .find_video(video_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("video not found".into()))?;
        if video.owner != actor {
            return Err(CoreError::Forbidden(format!(
                "only the owner can {action} this video"
            )));
        }
        Ok(video)
    }
}
