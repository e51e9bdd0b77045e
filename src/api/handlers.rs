use axum::{
    Json,
    extract::{
        Path as AxumPath, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{AppState, ApiError, ApiResponse, ApiResult, Caller};
use crate::{
    comments::CommentView,
    detail::VideoDetail,
    feed::{FeedFilter, VideoSummary},
    model::{Comment, NewVideo, Video},
    pagination::Page,
    subscriptions::{SubscribedChannel, SubscriberProfile},
    toggle::RelationKind,
    videos::VideoUpdate,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PublishState {
    is_published: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct SubscribedState {
    subscribed: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct LikedState {
    liked: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct CommentBody {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct PageQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

pub(super) async fn healthcheck() -> ApiResult<Value> {
    Ok(ApiResponse::ok(json!({ "status": "ok" }), "OK"))
}

pub(super) async fn not_found() -> impl IntoResponse {
    ApiError::not_found("endpoint not found")
}

pub(super) async fn list_videos(
    State(state): State<AppState>,
    query: Result<Query<FeedFilter>, QueryRejection>,
) -> ApiResult<Page<VideoSummary>> {
    let Query(filter) = query?;
    let page = state.engine.list_videos(&filter).await?;
    Ok(ApiResponse::ok(page, "Videos fetched successfully"))
}

pub(super) async fn publish_video(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<NewVideo>, JsonRejection>,
) -> ApiResult<Video> {
    let Json(input) = payload?;
    let video = state.engine.publish_video(&caller.id(), input).await?;
    Ok(ApiResponse::created(video, "Video uploaded successfully"))
}

pub(super) async fn get_video(
    State(state): State<AppState>,
    caller: Caller,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<VideoDetail> {
    let detail = state.engine.get_video_detail(&id, &caller.id()).await?;
    Ok(ApiResponse::ok(detail, "Video fetched successfully"))
}

pub(super) async fn update_video(
    State(state): State<AppState>,
    caller: Caller,
    AxumPath(id): AxumPath<String>,
    payload: Result<Json<VideoUpdate>, JsonRejection>,
) -> ApiResult<Video> {
    let Json(update) = payload?;
    let video = state.engine.update_video(&id, &caller.id(), update).await?;
    Ok(ApiResponse::ok(video, "Video updated successfully"))
}

/// Empty payload unless some cleanup step failed.
pub(super) async fn delete_video(
    State(state): State<AppState>,
    caller: Caller,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Value> {
    let report = state.engine.delete_video(&id, &caller.id()).await?;
    if report.is_clean() {
        Ok(ApiResponse::ok(json!({}), "Video deleted successfully"))
    } else {
        Ok(ApiResponse::ok(
            json!({ "cleanupFailures": report.failures }),
            "Video deleted; some cleanup steps failed",
        ))
    }
}

pub(super) async fn toggle_publish(
    State(state): State<AppState>,
    caller: Caller,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<PublishState> {
    let is_published = state
        .engine
        .toggle_publish_status(&id, &caller.id())
        .await?;
    Ok(ApiResponse::ok(
        PublishState { is_published },
        "Publish status toggled successfully",
    ))
}

pub(super) async fn toggle_subscription(
    State(state): State<AppState>,
    caller: Caller,
    AxumPath(channel_id): AxumPath<String>,
) -> ApiResult<SubscribedState> {
    let subscribed = state
        .engine
        .toggle_subscription(&caller.id(), &channel_id)
        .await?;
    let message = if subscribed {
        "Subscribed successfully"
    } else {
        "Unsubscribed successfully"
    };
    Ok(ApiResponse::ok(SubscribedState { subscribed }, message))
}

pub(super) async fn channel_subscribers(
    State(state): State<AppState>,
    _caller: Caller,
    AxumPath(channel_id): AxumPath<String>,
) -> ApiResult<Vec<SubscriberProfile>> {
    let subscribers = state.engine.channel_subscribers(&channel_id).await?;
    Ok(ApiResponse::ok(subscribers, "Subscribers fetched successfully"))
}

pub(super) async fn subscribed_channels(
    State(state): State<AppState>,
    _caller: Caller,
    AxumPath(subscriber_id): AxumPath<String>,
) -> ApiResult<Vec<SubscribedChannel>> {
    let channels = state.engine.subscribed_channels(&subscriber_id).await?;
    Ok(ApiResponse::ok(channels, "Subscribed channels fetched successfully"))
}

async fn toggle_like(state: AppState, caller: Caller, kind: RelationKind, id: String) -> ApiResult<LikedState> {
    let liked = state.engine.toggle_like(kind, &caller.id(), &id).await?;
    let message = if liked { "Liked" } else { "Like removed" };
    Ok(ApiResponse::ok(LikedState { liked }, message))
}

pub(super) async fn toggle_video_like(
    State(state): State<AppState>,
    caller: Caller,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<LikedState> {
    toggle_like(state, caller, RelationKind::LikeVideo, id).await
}

pub(super) async fn toggle_comment_like(
    State(state): State<AppState>,
    caller: Caller,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<LikedState> {
    toggle_like(state, caller, RelationKind::LikeComment, id).await
}

pub(super) async fn toggle_tweet_like(
    State(state): State<AppState>,
    caller: Caller,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<LikedState> {
    toggle_like(state, caller, RelationKind::LikeTweet, id).await
}

pub(super) async fn list_comments(
    State(state): State<AppState>,
    AxumPath(video_id): AxumPath<String>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Page<CommentView>> {
    let Query(query) = query?;
    let page = state
        .engine
        .list_comments(&video_id, query.page, query.limit)
        .await?;
    Ok(ApiResponse::ok(page, "Comments fetched successfully"))
}

pub(super) async fn add_comment(
    State(state): State<AppState>,
    caller: Caller,
    AxumPath(video_id): AxumPath<String>,
    payload: Result<Json<CommentBody>, JsonRejection>,
) -> ApiResult<Comment> {
    let Json(body) = payload?;
    let comment = state
        .engine
        .add_comment(&video_id, &caller.id(), &body.content)
        .await?;
    Ok(ApiResponse::created(comment, "Comment added successfully"))
}

pub(super) async fn update_comment(
    State(state): State<AppState>,
    caller: Caller,
    AxumPath(comment_id): AxumPath<String>,
    payload: Result<Json<CommentBody>, JsonRejection>,
) -> ApiResult<Comment> {
    let Json(body) = payload?;
    let comment = state
        .engine
        .update_comment(&comment_id, &caller.id(), &body.content)
        .await?;
    Ok(ApiResponse::ok(comment, "Comment updated successfully"))
}

pub(super) async fn delete_comment(
    State(state): State<AppState>,
    caller: Caller,
    AxumPath(comment_id): AxumPath<String>,
) -> ApiResult<Value> {
    state
        .engine
        .delete_comment(&comment_id, &caller.id())
        .await?;
    Ok(ApiResponse::ok(json!({}), "Comment deleted successfully"))
}

pub(super) async fn watch_history(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Vec<VideoSummary>> {
    let videos = state.engine.watch_history_videos(&caller.id()).await?;
    Ok(ApiResponse::ok(videos, "Watch history fetched successfully"))
}
