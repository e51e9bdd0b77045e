#![forbid(unsafe_code)]

//! Idempotent create-or-destroy over two-party relations.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    engine::Engine,
    error::{CoreError, CoreResult},
    model::{EntityId, LikeTarget},
    store::Relation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Subscription,
    LikeVideo,
    LikeComment,
    LikeTweet,
}

impl RelationKind {
    /// Name of the target parameter, used in identifier errors.
    pub fn target_field(self) -> &'static str {
        match self {
            Self::Subscription => "channelId",
            Self::LikeVideo => "videoId",
            Self::LikeComment => "commentId",
            Self::LikeTweet => "tweetId",
        }
    }

    fn relation(self, actor: EntityId, target: EntityId) -> Relation {
        match self {
            Self::Subscription => Relation::Subscription {
                subscriber: actor,
                channel: target,
            },
            Self::LikeVideo => Relation::Like {
                liker: actor,
                target: LikeTarget::Video(target),
            },
            Self::LikeComment => Relation::Like {
                liker: actor,
                target: LikeTarget::Comment(target),
            },
            Self::LikeTweet => Relation::Like {
                liker: actor,
                target: LikeTarget::Tweet(target),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub active: bool,
}

impl Engine {
    /// Deletes the relation if it exists, creates it otherwise, and reports
    /// the resulting state.
    ///
    /// Concurrent toggles on the same pair are settled by the unique pair
    /// index: an insert that loses the race leaves the relation active.
    pub async fn toggle(
        &self,
        kind: RelationKind,
        actor_id: &str,
        target_id: &str,
    ) -> CoreResult<ToggleOutcome> {
        let actor = EntityId::parse(actor_id, "userId")?;
        let target = EntityId::parse(target_id, kind.target_field())?;
        if kind == RelationKind::Subscription && actor == target {
            return Err(CoreError::InvalidArgument(
                "cannot subscribe to your own channel".into(),
            ));
        }
        self.ensure_target_exists(kind, target).await?;

        let relation = kind.relation(actor, target);
        let store = self.store();
        if let Some(existing) = store.find_relation(&relation).await? {
            let removed = store.delete_relation(&relation, existing).await?;
            if removed == 0 {
                debug!(?relation, "relation already removed concurrently");
            }
            info!(?relation, "relation deactivated");
            return Ok(ToggleOutcome { active: false });
        }

        let created = store
            .insert_relation(&relation, EntityId::generate(), Utc::now())
            .await?;
        if !created {
            debug!(?relation, "concurrent toggle created the relation first");
            return Ok(ToggleOutcome { active: true });
        }
        if store.find_relation(&relation).await?.is_none() {
            return Err(CoreError::Internal(
                "relation missing right after creation".into(),
            ));
        }
        info!(?relation, "relation activated");
        Ok(ToggleOutcome { active: true })
    }

    /// Returns whether `subscriber` now follows `channel`.
    pub async fn toggle_subscription(&self, subscriber: &str, channel: &str) -> CoreResult<bool> {
        self.toggle(RelationKind::Subscription, subscriber, channel)
            .await
            .map(|outcome| outcome.active)
    }

    /// Returns whether `liker` now likes the target.
    pub async fn toggle_like(
        &self,
        kind: RelationKind,
        liker: &str,
        target: &str,
    ) -> CoreResult<bool> {
        if kind == RelationKind::Subscription {
            return Err(CoreError::InvalidArgument(
                "subscription is not a like target".into(),
            ));
        }
        self.toggle(kind, liker, target)
            .await
            .map(|outcome| outcome.active)
    }

    async fn ensure_target_exists(&self, kind: RelationKind, target: EntityId) -> CoreResult<()> {
        let store = self.store();
        let (exists, what) = match kind {
            RelationKind::Subscription => (store.user_exists(target).await?, "channel"),
            RelationKind::LikeVideo => (store.video_exists(target).await?, "video"),
            RelationKind::LikeComment => (store.find_comment(target).await?.is_some(), "comment"),
            // Tweets live outside this store; only the identifier is checked.
            RelationKind::LikeTweet => (true, "tweet"),
        };
        if exists {
            Ok(())
        } else {
            Err(CoreError::NotFound(format!("{what} not found")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::temp_engine;
    use crate::model::Comment;
    use crate::store::test_support::{seed_user, seed_video};

    #[tokio::test]
    async fn subscription_toggle_alternates() {
        let (_dir, engine, _) = temp_engine().await;
        let a = seed_user(engine.store(), "a").await;
        let b = seed_user(engine.store(), "b").await;
        let (actor, channel) = (a.id.to_string(), b.id.to_string());

        for round in 1..=5 {
            let active = engine.toggle_subscription(&actor, &channel).await.unwrap();
            assert_eq!(active, round % 2 == 1);
            let count = engine.store().count_subscribers(b.id).await.unwrap();
            assert_eq!(count, if round % 2 == 1 { 1 } else { 0 });
        }
    }

    #[tokio::test]
    async fn even_number_of_toggles_leaves_nothing() {
        let (_dir, engine, _) = temp_engine().await;
        let a = seed_user(engine.store(), "a").await;
        let b = seed_user(engine.store(), "b").await;
        for _ in 0..4 {
            engine
                .toggle(RelationKind::Subscription, &a.id.to_string(), &b.id.to_string())
                .await
                .unwrap();
        }
        let relation = Relation::Subscription {
            subscriber: a.id,
            channel: b.id,
        };
        assert!(engine.store().find_relation(&relation).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn self_subscription_is_rejected() {
        let (_dir, engine, _) = temp_engine().await;
        let a = seed_user(engine.store(), "solo").await;
        let err = engine
            .toggle_subscription(&a.id.to_string(), &a.id.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
        assert_eq!(engine.store().count_subscribers(a.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn malformed_and_unknown_targets() {
        let (_dir, engine, _) = temp_engine().await;
        let a = seed_user(engine.store(), "a").await;

        let err = engine
            .toggle_subscription(&a.id.to_string(), "xyz")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid channelId");

        let err = engine
            .toggle_subscription("bogus", &a.id.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidIdentifier(_)));

        let err = engine
            .toggle_like(
                RelationKind::LikeVideo,
                &a.id.to_string(),
                &EntityId::generate().to_string(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn likes_on_each_target_kind() {
        let (_dir, engine, _) = temp_engine().await;
        let a = seed_user(engine.store(), "a").await;
        let video = seed_video(engine.store(), a.id, "liked").await;
        let now = Utc::now();
        let comment = Comment {
            id: EntityId::generate(),
            video: video.id,
            owner: a.id,
            content: "nice".into(),
            created_at: now,
            updated_at: now,
        };
        engine.store().insert_comment(&comment).await.unwrap();
        let tweet = EntityId::generate();
        let liker = a.id.to_string();

        assert!(
            engine
                .toggle_like(RelationKind::LikeVideo, &liker, &video.id.to_string())
                .await
                .unwrap()
        );
        assert!(
            engine
                .toggle_like(RelationKind::LikeComment, &liker, &comment.id.to_string())
                .await
                .unwrap()
        );
        assert!(
            engine
                .toggle_like(RelationKind::LikeTweet, &liker, &tweet.to_string())
                .await
                .unwrap()
        );

        let store = engine.store();
        assert_eq!(store.count_likes(LikeTarget::Video(video.id)).await.unwrap(), 1);
        assert_eq!(store.count_likes(LikeTarget::Comment(comment.id)).await.unwrap(), 1);
        assert_eq!(store.count_likes(LikeTarget::Tweet(tweet)).await.unwrap(), 1);

        assert!(
            !engine
                .toggle_like(RelationKind::LikeVideo, &liker, &video.id.to_string())
                .await
                .unwrap()
        );
        assert_eq!(store.count_likes(LikeTarget::Video(video.id)).await.unwrap(), 0);
        assert_eq!(store.count_likes(LikeTarget::Comment(comment.id)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_toggles_never_duplicate() {
        let (_dir, engine, _) = temp_engine().await;
        let a = seed_user(engine.store(), "a").await;
        let b = seed_user(engine.store(), "b").await;
        let (actor, channel) = (a.id.to_string(), b.id.to_string());

        let (first, second) = tokio::join!(
            engine.toggle_subscription(&actor, &channel),
            engine.toggle_subscription(&actor, &channel),
        );
        first.unwrap();
        second.unwrap();
        assert!(engine.store().count_subscribers(b.id).await.unwrap() <= 1);
    }

    #[tokio::test]
    async fn toggle_like_refuses_subscription_kind() {
        let (_dir, engine, _) = temp_engine().await;
        let a = seed_user(engine.store(), "a").await;
        let b = seed_user(engine.store(), "b").await;
        let err = engine
            .toggle_like(RelationKind::Subscription, &a.id.to_string(), &b.id.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
    }
}
