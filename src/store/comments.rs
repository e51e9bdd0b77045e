use chrono::{DateTime, Utc};
use libsql::params;

use super::{EntityStore, row_to_comment};
use crate::{
    error::CoreResult,
    model::{Comment, EntityId, format_timestamp},
};

impl EntityStore {
    pub async fn insert_comment(&self, comment: &Comment) -> CoreResult<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO comments (id, video_id, owner_id, content, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    comment.id.to_string(),
                    comment.video.to_string(),
                    comment.owner.to_string(),
                    comment.content.as_str(),
                    format_timestamp(comment.created_at),
                    format_timestamp(comment.updated_at),
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn find_comment(&self, id: EntityId) -> CoreResult<Option<Comment>> {
        let mut rows = self
            .conn
            .query(
                r#"
                SELECT id, video_id, owner_id, content, created_at, updated_at
                FROM comments
                WHERE id = ?1
                "#,
                params![id.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_comment(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn update_comment_content(
        &self,
        id: EntityId,
        content: &str,
        updated_at: DateTime<Utc>,
    ) -> CoreResult<u64> {
        Ok(self
            .conn
            .execute(
                "UPDATE comments SET content = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.to_string(), content, format_timestamp(updated_at)],
            )
            .await?)
    }

    pub async fn delete_comment(&self, id: EntityId) -> CoreResult<u64> {
        Ok(self
            .conn
            .execute("DELETE FROM comments WHERE id = ?1", params![id.to_string()])
            .await?)
    }

    pub async fn delete_comments_for_video(&self, video: EntityId) -> CoreResult<u64> {
        Ok(self
            .conn
            .execute(
                "DELETE FROM comments WHERE video_id = ?1",
                params![video.to_string()],
            )
            .await?)
    }

    pub async fn count_comments_for_video(&self, video: EntityId) -> CoreResult<i64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM comments WHERE video_id = ?1",
                params![video.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{seed_user, seed_video, temp_store};

    fn comment_on(video: EntityId, owner: EntityId, content: &str) -> Comment {
        let now = Utc::now();
        Comment {
            id: EntityId::generate(),
            video,
            owner,
            content: content.into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn comments_are_scoped_to_their_video() {
        let (_dir, store) = temp_store().await;
        let owner = seed_user(&store, "owner").await;
        let kept = seed_video(&store, owner.id, "Kept").await;
        let dropped = seed_video(&store, owner.id, "Dropped").await;

        store
            .insert_comment(&comment_on(kept.id, owner.id, "stays"))
            .await
            .unwrap();
        for text in ["one", "two"] {
            store
                .insert_comment(&comment_on(dropped.id, owner.id, text))
                .await
                .unwrap();
        }

        assert_eq!(store.delete_comments_for_video(dropped.id).await.unwrap(), 2);
        assert_eq!(store.count_comments_for_video(dropped.id).await.unwrap(), 0);
        assert_eq!(store.count_comments_for_video(kept.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_comment_content_rewrites_text() {
        let (_dir, store) = temp_store().await;
        let owner = seed_user(&store, "owner").await;
        let video = seed_video(&store, owner.id, "Talk").await;
        let comment = comment_on(video.id, owner.id, "first");
        store.insert_comment(&comment).await.unwrap();

        store
            .update_comment_content(comment.id, "edited", Utc::now())
            .await
            .unwrap();
        let found = store.find_comment(comment.id).await.unwrap().unwrap();
        assert_eq!(found.content, "edited");
    }
}
