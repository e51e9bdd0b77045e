#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use libsql::params;
use serde::Serialize;
use tracing::info;

use crate::{
    engine::Engine,
    error::{CoreError, CoreResult},
    model::{Comment, EntityId, LikeTarget, OwnerSummary, parse_timestamp},
    pagination::{Page, PageRequest},
    store::{entity_id_at, row_to_owner_summary},
};

/// Comment as listed under a video.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: EntityId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner: OwnerSummary,
    pub like_count: i64,
}

fn comment_text(content: &str) -> CoreResult<&str> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidArgument("content is required".into()));
    }
    Ok(trimmed)
}

impl Engine {
    pub async fn add_comment(&self, video_id: &str, author_id: &str, content: &str) -> CoreResult<Comment> {
        let video = EntityId::parse(video_id, "videoId")?;
        let author = EntityId::parse(author_id, "userId")?;
        let content = comment_text(content)?;
        let store = self.store();
        if !store.video_exists(video).await? {
            return Err(CoreError::NotFound("video not found".into()));
        }

        let now = Utc::now();
        let comment = Comment {
            id: EntityId::generate(),
            video,
            owner: author,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        store.insert_comment(&comment).await?;
        let created = store
            .find_comment(comment.id)
            .await?
            .ok_or_else(|| CoreError::Internal("comment missing right after creation".into()))?;
        info!(comment = %created.id, %video, "comment added");
        Ok(created)
    }

    /// Comments on a video, newest first, with author summary and like count.
    pub async fn list_comments(
        &self,
        video_id: &str,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> CoreResult<Page<CommentView>> {
        let video = EntityId::parse(video_id, "videoId")?;
        let request = PageRequest::new(page, limit, self.settings().page_size_max);
        let store = self.store();
        if !store.video_exists(video).await? {
            return Err(CoreError::NotFound("video not found".into()));
        }

        let mut rows = store
            .conn()
            .query(
                "SELECT COUNT(*) FROM comments c JOIN users u ON u.id = c.owner_id WHERE c.video_id = ?1",
                params![video.to_string()],
            )
            .await?;
        let total: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };

        let mut rows = store
            .conn()
            .query(
                r#"
                SELECT c.id, c.content, c.created_at, c.updated_at,
                       u.id, u.username, u.avatar_url,
                       (SELECT COUNT(*) FROM likes l
                        WHERE l.target_kind = 'comment' AND l.target_id = c.id)
                FROM comments c
                JOIN users u ON u.id = c.owner_id
                WHERE c.video_id = ?1
                ORDER BY c.created_at DESC, c.rowid DESC
                LIMIT ?2 OFFSET ?3
                "#,
                params![
                    video.to_string(),
                    i64::from(request.limit()),
                    request.offset() as i64
                ],
            )
            .await?;
        let mut docs = Vec::new();
        while let Some(row) = rows.next().await? {
            let created_at: String = row.get(2)?;
            let updated_at: String = row.get(3)?;
            docs.push(CommentView {
                id: entity_id_at(&row, 0)?,
                content: row.get(1)?,
                created_at: parse_timestamp(&created_at)?,
                updated_at: parse_timestamp(&updated_at)?,
                owner: row_to_owner_summary(&row, 4)?,
                like_count: row.get(7)?,
            });
        }
        Ok(Page::new(docs, total.max(0) as u64, request))
    }

    pub async fn update_comment(&self, comment_id: &str, actor_id: &str, content: &str) -> CoreResult<Comment> {
        let comment_id = EntityId::parse(comment_id, "commentId")?;
        let actor = EntityId::parse(actor_id, "userId")?;
        let content = comment_text(content)?;
        self.authored_comment(comment_id, actor, "edit").await?;

        let store = self.store();
        if store
            .update_comment_content(comment_id, content, Utc::now())
            .await?
            == 0
        {
            return Err(CoreError::NotFound("comment not found".into()));
        }
        let updated = store
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| CoreError::Internal("comment missing right after update".into()))?;
        info!(comment = %comment_id, "comment updated");
        Ok(updated)
    }

    /// Deletes the comment and the likes pointing at it.
    pub async fn delete_comment(&self, comment_id: &str, actor_id: &str) -> CoreResult<()> {
        let comment_id = EntityId::parse(comment_id, "commentId")?;
        let actor = EntityId::parse(actor_id, "userId")?;
        self.authored_comment(comment_id, actor, "delete").await?;

        let store = self.store();
        store.delete_comment(comment_id).await?;
        let likes = store
            .delete_likes_for_target(LikeTarget::Comment(comment_id))
            .await?;
        info!(comment = %comment_id, likes, "comment deleted");
        Ok(())
    }

    async fn authored_comment(&self, comment_id: EntityId, actor: EntityId, action: &str) -> CoreResult<Comment> {
        let comment = self
            .store()
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("comment not found".into()))?;
        if comment.owner != actor {
            return Err(CoreError::Forbidden(format!(
                "only the author can {action} this comment"
            )));
        }
        Ok(comment)
    }
}
