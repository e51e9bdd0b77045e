#![forbid(unsafe_code)]

use libsql::params;

use crate::{
    engine::Engine,
    error::{CoreError, CoreResult},
    feed::{VideoSummary, row_to_summary},
    model::{EntityId, WatchHistory},
    store::VIDEO_COLUMNS,
};

impl Engine {
    /// The user's watch history as ids, most recent first.
    pub async fn watch_history(&self, user_id: &str) -> CoreResult<WatchHistory> {
        let user = EntityId::parse(user_id, "userId")?;
        if !self.store().user_exists(user).await? {
            return Err(CoreError::NotFound("user not found".into()));
        }
        let ids = self.store().watch_history_ids(user).await?;
        Ok(WatchHistory::from_recent_first(ids))
    }

    /// Watched videos with their owner, most recent first. Videos deleted
    /// since are skipped.
    pub async fn watch_history_videos(&self, user_id: &str) -> CoreResult<Vec<VideoSummary>> {
        let user = EntityId::parse(user_id, "userId")?;
        let store = self.store();
        if !store.user_exists(user).await? {
            return Err(CoreError::NotFound("user not found".into()));
        }
        let mut rows = store
            .conn()
            .query(
                &format!(
                    r#"
                    SELECT {VIDEO_COLUMNS}, u.id, u.username, u.avatar_url
                    FROM watch_history h
                    JOIN videos v ON v.id = h.video_id
                    JOIN users u ON u.id = v.owner_id
                    WHERE h.user_id = ?1
                    ORDER BY h.seq DESC
                    "#
                ),
                params![user.to_string()],
            )
            .await?;
        let mut videos = Vec::new();
        while let Some(row) = rows.next().await? {
            videos.push(row_to_summary(&row)?);
        }
        Ok(videos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::temp_engine;
    use crate::store::test_support::{seed_user, seed_video};

    #[tokio::test]
    async fn history_is_deduplicated_and_recent_first() {
        let (_dir, engine, _) = temp_engine().await;
        let owner = seed_user(engine.store(), "owner").await;
        let viewer = seed_user(engine.store(), "viewer").await;
        let a = seed_video(engine.store(), owner.id, "a").await;
        let b = seed_video(engine.store(), owner.id, "b").await;
        let viewer_id = viewer.id.to_string();

        for video in [&a, &b, &a, &a] {
            engine
                .get_video_detail(&video.id.to_string(), &viewer_id)
                .await
                .unwrap();
        }

        let history = engine.watch_history(&viewer_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.contains(&a.id));
        assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![a.id, b.id]);

        let videos = engine.watch_history_videos(&viewer_id).await.unwrap();
        let ids: Vec<_> = videos.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
        assert_eq!(videos[0].owner_details.username, "owner");
    }

    #[tokio::test]
    async fn deleted_videos_drop_out_of_history() {
        let (_dir, engine, _) = temp_engine().await;
        let owner = seed_user(engine.store(), "owner").await;
        let viewer = seed_user(engine.store(), "viewer").await;
        let video = seed_video(engine.store(), owner.id, "gone soon").await;
        engine
            .get_video_detail(&video.id.to_string(), &viewer.id.to_string())
            .await
            .unwrap();
        engine.store().delete_video(video.id).await.unwrap();

        let videos = engine
            .watch_history_videos(&viewer.id.to_string())
            .await
            .unwrap();
        assert!(videos.is_empty());
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let (_dir, engine, _) = temp_engine().await;
        let err = engine
            .watch_history(&EntityId::generate().to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
