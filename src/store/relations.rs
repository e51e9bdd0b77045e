use chrono::{DateTime, Utc};
use libsql::params;

use super::EntityStore;
use crate::{
    error::CoreResult,
    model::{EntityId, LikeTarget, format_timestamp},
};

/// A two-party relation that is only ever created or destroyed, never
/// updated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Subscription { subscriber: EntityId, channel: EntityId },
    Like { liker: EntityId, target: LikeTarget },
}

impl EntityStore {
    /// Id of the record backing `relation`, if one exists.
    pub async fn find_relation(&self, relation: &Relation) -> CoreResult<Option<EntityId>> {
        let mut rows = match relation {
            Relation::Subscription {
                subscriber,
                channel,
            } => {
                self.conn
                    .query(
                        "SELECT id FROM subscriptions WHERE subscriber_id = ?1 AND channel_id = ?2",
                        params![subscriber.to_string(), channel.to_string()],
                    )
                    .await?
            }
            Relation::Like { liker, target } => {
                self.conn
                    .query(
                        r#"
                        SELECT id FROM likes
                        WHERE liked_by = ?1 AND target_kind = ?2 AND target_id = ?3
                        "#,
                        params![liker.to_string(), target.kind(), target.id().to_string()],
                    )
                    .await?
            }
        };
        match rows.next().await? {
            Some(row) => Ok(Some(super::entity_id_at(&row, 0)?)),
            None => Ok(None),
        }
    }

    /// Inserts the record unless the unique pair index already holds one.
    /// Returns `true` when this call created it.
    pub async fn insert_relation(
        &self,
        relation: &Relation,
        id: EntityId,
        created_at: DateTime<Utc>,
    ) -> CoreResult<bool> {
        let inserted = match relation {
            Relation::Subscription {
                subscriber,
                channel,
            } => {
                self.conn
                    .execute(
                        r#"
                        INSERT INTO subscriptions (id, subscriber_id, channel_id, created_at)
                        VALUES (?1, ?2, ?3, ?4)
                        ON CONFLICT DO NOTHING
                        "#,
                        params![
                            id.to_string(),
                            subscriber.to_string(),
                            channel.to_string(),
                            format_timestamp(created_at),
                        ],
                    )
                    .await?
            }
            Relation::Like { liker, target } => {
                self.conn
                    .execute(
                        r#"
                        INSERT INTO likes (id, liked_by, target_kind, target_id, created_at)
                        VALUES (?1, ?2, ?3, ?4, ?5)
                        ON CONFLICT DO NOTHING
                        "#,
                        params![
                            id.to_string(),
                            liker.to_string(),
                            target.kind(),
                            target.id().to_string(),
                            format_timestamp(created_at),
                        ],
                    )
                    .await?
            }
        };
        Ok(inserted > 0)
    }

    /// Deletes by record id. Deleting an already-gone record is not an error.
    pub async fn delete_relation(&self, relation: &Relation, id: EntityId) -> CoreResult<u64> {
        let sql = match relation {
            Relation::Subscription { .. } => "DELETE FROM subscriptions WHERE id = ?1",
            Relation::Like { .. } => "DELETE FROM likes WHERE id = ?1",
        };
        Ok(self.conn.execute(sql, params![id.to_string()]).await?)
    }

    pub async fn count_likes(&self, target: LikeTarget) -> CoreResult<i64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM likes WHERE target_kind = ?1 AND target_id = ?2",
                params![target.kind(), target.id().to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }

    pub async fn count_subscribers(&self, channel: EntityId) -> CoreResult<i64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM subscriptions WHERE channel_id = ?1",
                params![channel.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }

    pub async fn delete_likes_for_target(&self, target: LikeTarget) -> CoreResult<u64> {
        Ok(self
            .conn
            .execute(
                "DELETE FROM likes WHERE target_kind = ?1 AND target_id = ?2",
                params![target.kind(), target.id().to_string()],
            )
            .await?)
    }

    /// Removes likes pointing at any comment of `video`. Must run before the
    /// comments themselves are deleted.
    pub async fn delete_likes_for_video_comments(&self, video: EntityId) -> CoreResult<u64> {
        Ok(self
            .conn
            .execute(
                r#"
                DELETE FROM likes
                WHERE target_kind = 'comment'
                  AND target_id IN (SELECT id FROM comments WHERE video_id = ?1)
                "#,
                params![video.to_string()],
            )
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{seed_user, temp_store};

    #[tokio::test]
    async fn unique_pair_blocks_second_insert() {
        let (_dir, store) = temp_store().await;
        let fan = seed_user(&store, "fan").await;
        let channel = seed_user(&store, "channel").await;
        let relation = Relation::Subscription {
            subscriber: fan.id,
            channel: channel.id,
        };

        assert!(store
            .insert_relation(&relation, EntityId::generate(), Utc::now())
            .await
            .unwrap());
        assert!(!store
            .insert_relation(&relation, EntityId::generate(), Utc::now())
            .await
            .unwrap());
        assert_eq!(store.count_subscribers(channel.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn like_kinds_do_not_collide() {
        let (_dir, store) = temp_store().await;
        let fan = seed_user(&store, "fan").await;
        let shared = EntityId::generate();

        for target in [LikeTarget::Video(shared), LikeTarget::Tweet(shared)] {
            let relation = Relation::Like {
                liker: fan.id,
                target,
            };
            assert!(store
                .insert_relation(&relation, EntityId::generate(), Utc::now())
                .await
                .unwrap());
        }
        assert_eq!(store.count_likes(LikeTarget::Video(shared)).await.unwrap(), 1);
        assert_eq!(store.count_likes(LikeTarget::Tweet(shared)).await.unwrap(), 1);
        assert_eq!(store.count_likes(LikeTarget::Comment(shared)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_relation_tolerates_missing_rows() {
        let (_dir, store) = temp_store().await;
        let relation = Relation::Like {
            liker: EntityId::generate(),
            target: LikeTarget::Video(EntityId::generate()),
        };
        assert_eq!(
            store
                .delete_relation(&relation, EntityId::generate())
                .await
                .unwrap(),
            0
        );
    }
}
