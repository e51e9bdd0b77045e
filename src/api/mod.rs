#![forbid(unsafe_code)]

//! HTTP surface over the engine. Authentication happens upstream; handlers
//! only see the caller identity it forwards.

mod caller;
mod envelope;
mod handlers;

use axum::{
    Router,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

use crate::engine::Engine;

pub use caller::{CALLER_HEADER, Caller};
pub use envelope::{ApiError, ApiResponse, ApiResult};

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
}

pub fn router(engine: Engine) -> Router {
    let api = Router::new()
        .route("/healthcheck", get(handlers::healthcheck))
        .route(
            "/videos",
            get(handlers::list_videos).post(handlers::publish_video),
        )
        .route(
            "/videos/{id}",
            get(handlers::get_video)
                .patch(handlers::update_video)
                .delete(handlers::delete_video),
        )
        .route(
            "/videos/toggle/publish/{id}",
            patch(handlers::toggle_publish),
        )
        .route(
            "/subscriptions/c/{channel_id}",
            post(handlers::toggle_subscription).get(handlers::channel_subscribers),
        )
        .route(
            "/subscriptions/u/{subscriber_id}",
            get(handlers::subscribed_channels),
        )
        .route("/likes/toggle/v/{id}", post(handlers::toggle_video_like))
        .route("/likes/toggle/c/{id}", post(handlers::toggle_comment_like))
        .route("/likes/toggle/t/{id}", post(handlers::toggle_tweet_like))
        .route(
            "/comments/{video_id}",
            get(handlers::list_comments).post(handlers::add_comment),
        )
        .route(
            "/comments/c/{comment_id}",
            patch(handlers::update_comment).delete(handlers::delete_comment),
        )
        .route("/users/history", get(handlers::watch_history));

    Router::new()
        .nest("/api/v1", api)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { engine })
}
