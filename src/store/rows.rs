use libsql::Row;

use crate::{
    error::{CoreError, CoreResult},
    model::{AssetRef, Comment, EntityId, OwnerSummary, User, Video, parse_timestamp},
};

/// Column list shared by every query that materializes a `Video`. Callers
/// alias the videos table as `v`.
pub(crate) const VIDEO_COLUMNS: &str = "v.id, v.owner_id, v.title, v.description, \
     v.video_url, v.video_public_id, v.thumbnail_url, v.thumbnail_public_id, \
     v.duration, v.views, v.is_published, v.created_at, v.updated_at";

/// Number of columns in `VIDEO_COLUMNS`; joined columns start here.
pub(crate) const VIDEO_COLUMN_COUNT: i32 = 13;

pub(crate) fn entity_id_at(row: &Row, idx: i32) -> CoreResult<EntityId> {
    let raw: String = row.get(idx)?;
    EntityId::parse(&raw, "stored identifier")
        .map_err(|_| CoreError::Internal(format!("corrupt identifier {raw:?} in store")))
}

fn timestamp_at(row: &Row, idx: i32) -> CoreResult<chrono::DateTime<chrono::Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw)
}

/// Column order must match `VIDEO_COLUMNS`.
pub(crate) fn row_to_video(row: &Row) -> CoreResult<Video> {
    Ok(Video {
        id: entity_id_at(row, 0)?,
        owner: entity_id_at(row, 1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        video_file: AssetRef {
            url: row.get(4)?,
            public_id: row.get(5)?,
        },
        thumbnail: AssetRef {
            url: row.get(6)?,
            public_id: row.get(7)?,
        },
        duration: row.get(8)?,
        views: row.get(9)?,
        is_published: row.get::<i64>(10).map(|value| value != 0)?,
        created_at: timestamp_at(row, 11)?,
        updated_at: timestamp_at(row, 12)?,
    })
}

/// Expects `id, username, full_name, avatar_url, avatar_public_id, created_at`.
pub(crate) fn row_to_user(row: &Row) -> CoreResult<User> {
    let avatar_url: Option<String> = row.get(3)?;
    let avatar_public_id: Option<String> = row.get(4)?;
    Ok(User {
        id: entity_id_at(row, 0)?,
        username: row.get(1)?,
        full_name: row.get(2)?,
        avatar: avatar_url.map(|url| AssetRef {
            url,
            public_id: avatar_public_id.unwrap_or_default(),
        }),
        created_at: timestamp_at(row, 5)?,
    })
}

/// Reads `owner id, username, avatar_url` starting at `offset`.
pub(crate) fn row_to_owner_summary(row: &Row, offset: i32) -> CoreResult<OwnerSummary> {
    Ok(OwnerSummary {
        id: entity_id_at(row, offset)?,
        username: row.get(offset + 1)?,
        avatar_url: row.get(offset + 2)?,
    })
}

/// Expects `id, video_id, owner_id, content, created_at, updated_at`.
pub(crate) fn row_to_comment(row: &Row) -> CoreResult<Comment> {
    Ok(Comment {
        id: entity_id_at(row, 0)?,
        video: entity_id_at(row, 1)?,
        owner: entity_id_at(row, 2)?,
        content: row.get(3)?,
        created_at: timestamp_at(row, 4)?,
        updated_at: timestamp_at(row, 5)?,
    })
}
