#![forbid(unsafe_code)]

//! Read/write core of a video platform's social and content graph: feed
//! listings, single-video detail views, relation toggles and cascading
//! deletes over a store without referential integrity.

pub mod api;
pub mod assets;
pub mod cascade;
pub mod comments;
pub mod config;
pub mod detail;
pub mod engine;
pub mod error;
pub mod feed;
pub mod history;
pub mod model;
pub mod pagination;
pub mod store;
pub mod subscriptions;
pub mod toggle;
pub mod videos;

pub use engine::{Engine, EngineSettings};
pub use error::{CoreError, CoreResult};
