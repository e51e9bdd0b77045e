#![forbid(unsafe_code)]

//! Video deletion and cleanup of everything that hangs off the video.
//!
//! The store enforces no referential integrity, so the dependents are removed
//! here. The video record goes first so it leaves the feed at once; every
//! later step is attempted even when an earlier one failed.

use std::future::Future;

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    assets::AssetKind,
    engine::Engine,
    error::{CleanupFailure, CoreError, CoreResult},
    model::{EntityId, LikeTarget},
};

/// What a deletion removed, plus each cleanup step that failed.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub assets_removed: u32,
    pub likes_removed: u64,
    pub comment_likes_removed: u64,
    pub comments_removed: u64,
    pub history_entries_removed: u64,
    pub failures: Vec<CleanupFailure>,
}

impl CascadeReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    async fn attempt<T>(
        &mut self,
        video: EntityId,
        step: &'static str,
        work: impl Future<Output = CoreResult<T>>,
    ) -> Option<T> {
        match work.await {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%video, step, error = %err, "cleanup step failed");
                self.failures.push(CleanupFailure::new(step, &err));
                None
            }
        }
    }
}

impl Engine {
    /// Deletes a video owned by `actor_id` together with its assets, likes,
    /// comments (and their likes) and watch-history entries.
    pub async fn delete_video(&self, video_id: &str, actor_id: &str) -> CoreResult<CascadeReport> {
        let video_id = EntityId::parse(video_id, "videoId")?;
        let actor = EntityId::parse(actor_id, "userId")?;
        let store = self.store();
        let video = store
            .find_video(video_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("video not found".into()))?;
        if video.owner != actor {
            return Err(CoreError::Forbidden(
                "only the owner can delete this video".into(),
            ));
        }

        if store.delete_video(video_id).await? == 0 {
            info!(video = %video_id, "video record already gone; cleaning dependents");
        }

        let mut report = CascadeReport::default();
        let assets = self.assets();
        if report
            .attempt(video_id, "media-asset", assets.delete(&video.video_file, AssetKind::Video))
            .await
            .is_some()
        {
            report.assets_removed += 1;
        }
        if report
            .attempt(video_id, "thumbnail-asset", assets.delete(&video.thumbnail, AssetKind::Image))
            .await
            .is_some()
        {
            report.assets_removed += 1;
        }

        // Comment likes are found through the comments, so they go first.
        report.comment_likes_removed = report
            .attempt(video_id, "comment-likes", store.delete_likes_for_video_comments(video_id))
            .await
            .unwrap_or_default();
        report.likes_removed = report
            .attempt(
                video_id,
                "video-likes",
                store.delete_likes_for_target(LikeTarget::Video(video_id)),
            )
            .await
            .unwrap_or_default();
        report.comments_removed = report
            .attempt(video_id, "comments", store.delete_comments_for_video(video_id))
            .await
            .unwrap_or_default();
        report.history_entries_removed = report
            .attempt(
                video_id,
                "watch-history",
                store.delete_watch_entries_for_video(video_id),
            )
            .await
            .unwrap_or_default();

        info!(
            video = %video_id,
            likes = report.likes_removed,
            comments = report.comments_removed,
            failures = report.failures.len(),
            "video deleted"
        );
        Ok(report)
    }
}
