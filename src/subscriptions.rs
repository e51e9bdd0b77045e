#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use libsql::params;
use serde::Serialize;

use crate::{
    engine::Engine,
    error::{CoreError, CoreResult},
    model::{EntityId, parse_timestamp},
    store::entity_id_at,
};

/// A user subscribed to some channel, seen from that channel.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberProfile {
    pub id: EntityId,
    pub username: String,
    pub full_name: String,
    pub avatar: Option<String>,
    /// The channel follows this subscriber back.
    pub subscribed_to_subscriber: bool,
    pub subscriber_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribedChannel {
    pub id: EntityId,
    pub username: String,
    pub full_name: String,
    pub avatar: Option<String>,
    pub subscriber_count: i64,
    pub subscribed_at: DateTime<Utc>,
}

impl Engine {
    /// Subscribers of `channel_id`, most recent first.
    pub async fn channel_subscribers(&self, channel_id: &str) -> CoreResult<Vec<SubscriberProfile>> {
        let channel = EntityId::parse(channel_id, "channelId")?;
        let store = self.store();
        if !store.user_exists(channel).await? {
            return Err(CoreError::NotFound("channel not found".into()));
        }
        let mut rows = store
            .conn()
            .query(
                r#"
                SELECT u.id, u.username, u.full_name, u.avatar_url,
                       EXISTS (
                           SELECT 1 FROM subscriptions back
                           WHERE back.subscriber_id = ?1 AND back.channel_id = u.id
                       ),
                       (SELECT COUNT(*) FROM subscriptions c WHERE c.channel_id = u.id)
                FROM subscriptions s
                JOIN users u ON u.id = s.subscriber_id
                WHERE s.channel_id = ?1
                ORDER BY s.created_at DESC, s.rowid DESC
                "#,
                params![channel.to_string()],
            )
            .await?;
        let mut subscribers = Vec::new();
        while let Some(row) = rows.next().await? {
            subscribers.push(SubscriberProfile {
                id: entity_id_at(&row, 0)?,
                username: row.get(1)?,
                full_name: row.get(2)?,
                avatar: row.get(3)?,
                subscribed_to_subscriber: row.get::<i64>(4)? != 0,
                subscriber_count: row.get(5)?,
            });
        }
        Ok(subscribers)
    }

    /// Channels `subscriber_id` follows, most recent subscription first.
    pub async fn subscribed_channels(
        &self,
        subscriber_id: &str,
    ) -> CoreResult<Vec<SubscribedChannel>> {
        let subscriber = EntityId::parse(subscriber_id, "subscriberId")?;
        let store = self.store();
        if !store.user_exists(subscriber).await? {
            return Err(CoreError::NotFound("user not found".into()));
        }
        let mut rows = store
            .conn()
            .query(
                r#"
                SELECT u.id, u.username, u.full_name, u.avatar_url,
                       (SELECT COUNT(*) FROM subscriptions c WHERE c.channel_id = u.id),
                       s.created_at
                FROM subscriptions s
                JOIN users u ON u.id = s.channel_id
                WHERE s.subscriber_id = ?1
                ORDER BY s.created_at DESC, s.rowid DESC
                "#,
                params![subscriber.to_string()],
            )
            .await?;
        let mut channels = Vec::new();
        while let Some(row) = rows.next().await? {
            let subscribed_at: String = row.get(5)?;
            channels.push(SubscribedChannel {
                id: entity_id_at(&row, 0)?,
                username: row.get(1)?,
                full_name: row.get(2)?,
                avatar: row.get(3)?,
                subscriber_count: row.get(4)?,
                subscribed_at: parse_timestamp(&subscribed_at)?,
            });
        }
        Ok(channels)
    }
}
