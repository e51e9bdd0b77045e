#![forbid(unsafe_code)]

//! Feed listing as an explicit, ordered stage pipeline.
//!
//! Stages always run in this order, whichever of them are switched on:
//!
//! 1. `Search`          - text match restricted to title/description
//! 2. `OwnerFilter`     - only videos of one owner
//! 3. `PublishedFilter` - only published videos (cannot be switched off)
//! 4. `Sort`            - explicit field/direction, else newest first
//! 5. `OwnerJoin`       - attach the trimmed owner projection
//! 6. `Paginate`        - slice one page and count the total
//!
//! The bundled store has no external search index, so `Search` degrades to a
//! case-insensitive substring match over the same two fields. The index name
//! still travels with the stage for stores that do have one.

use chrono::{DateTime, Utc};
use libsql::{Value, params::Params};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    engine::Engine,
    error::{CoreError, CoreResult},
    model::{AssetRef, EntityId, OwnerSummary},
    pagination::{Page, PageRequest},
    store::{VIDEO_COLUMN_COUNT, VIDEO_COLUMNS, row_to_owner_summary, row_to_video},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Views,
    CreatedAt,
    Duration,
}

impl SortField {
    pub fn parse(value: &str) -> CoreResult<Self> {
        match value.trim() {
            "views" => Ok(Self::Views),
            "createdAt" => Ok(Self::CreatedAt),
            "duration" => Ok(Self::Duration),
            other => Err(CoreError::InvalidArgument(format!(
                "sortBy must be one of views, createdAt, duration (got {other:?})"
            ))),
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Views => "v.views",
            Self::CreatedAt => "v.created_at",
            Self::Duration => "v.duration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> CoreResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(CoreError::InvalidArgument(format!(
                "sortType must be asc or desc (got {other:?})"
            ))),
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Raw listing parameters as they arrive from the caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedFilter {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub query: Option<String>,
    pub sort_by: Option<String>,
    pub sort_type: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Search { index: String, text: String },
    OwnerFilter(EntityId),
    PublishedFilter,
    Sort { field: SortField, direction: SortDirection },
    OwnerJoin,
    Paginate(PageRequest),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Search { .. } => "search",
            Self::OwnerFilter(_) => "owner-filter",
            Self::PublishedFilter => "publication-filter",
            Self::Sort { .. } => "sort",
            Self::OwnerJoin => "owner-join",
            Self::Paginate(_) => "paginate",
        }
    }
}

/// Collects optional stages in any order; `build` lays them out in the
/// documented order and adds the mandatory ones.
#[derive(Debug, Clone, Default)]
pub struct FeedPipelineBuilder {
    search: Option<(String, String)>,
    owner: Option<EntityId>,
    sort: Option<(SortField, SortDirection)>,
    page: PageRequest,
}

impl FeedPipelineBuilder {
    pub fn search(mut self, index: impl Into<String>, text: impl Into<String>) -> Self {
        self.search = Some((index.into(), text.into()));
        self
    }

    pub fn owner(mut self, owner: EntityId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn sort(mut self, field: SortField, direction: SortDirection) -> Self {
        self.sort = Some((field, direction));
        self
    }

    pub fn paginate(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    pub fn build(self) -> FeedPipeline {
        let mut stages = Vec::with_capacity(6);
        if let Some((index, text)) = self.search {
            stages.push(Stage::Search { index, text });
        }
        if let Some(owner) = self.owner {
            stages.push(Stage::OwnerFilter(owner));
        }
        stages.push(Stage::PublishedFilter);
        let (field, direction) = self
            .sort
            .unwrap_or((SortField::CreatedAt, SortDirection::Desc));
        stages.push(Stage::Sort { field, direction });
        stages.push(Stage::OwnerJoin);
        stages.push(Stage::Paginate(self.page));
        FeedPipeline { stages }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedPipeline {
    stages: Vec<Stage>,
}

/// SQL fragments produced from the stages.
struct CompiledFeed {
    from: String,
    filters: Vec<String>,
    filter_params: Vec<Value>,
    order_by: String,
    page: PageRequest,
}

impl CompiledFeed {
    fn where_clause(&self) -> String {
        if self.filters.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.filters.join(" AND "))
        }
    }
}

impl FeedPipeline {
    pub fn builder() -> FeedPipelineBuilder {
        FeedPipelineBuilder::default()
    }

    /// Turns caller input into a pipeline, validating ids and sort keys.
    /// Sorting only applies when both `sortBy` and `sortType` are given.
    pub fn from_filter(filter: &FeedFilter, search_index: &str, page_size_max: u32) -> CoreResult<Self> {
        let mut builder = Self::builder().paginate(PageRequest::new(
            filter.page,
            filter.limit,
            page_size_max,
        ));
        if let Some(text) = filter.query.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            builder = builder.search(search_index, text);
        }
        if let Some(owner) = filter.user_id.as_deref().filter(|raw| !raw.trim().is_empty()) {
            builder = builder.owner(EntityId::parse(owner, "userId")?);
        }
        let sort_by = filter.sort_by.as_deref().filter(|raw| !raw.trim().is_empty());
        let sort_type = filter.sort_type.as_deref().filter(|raw| !raw.trim().is_empty());
        if let (Some(field), Some(direction)) = (sort_by, sort_type) {
            builder = builder.sort(SortField::parse(field)?, SortDirection::parse(direction)?);
        } else if let Some(field) = sort_by {
            SortField::parse(field)?;
        }
        Ok(builder.build())
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(Stage::name).collect()
    }

    fn compile(&self) -> CompiledFeed {
        let mut compiled = CompiledFeed {
            from: "videos v".to_string(),
            filters: Vec::new(),
            filter_params: Vec::new(),
            order_by: String::new(),
            page: PageRequest::default(),
        };
        for stage in &self.stages {
            match stage {
                Stage::Search { text, .. } => {
                    compiled.filters.push(
                        "(instr(lower(v.title), lower(?)) > 0 \
                         OR instr(lower(v.description), lower(?)) > 0)"
                            .to_string(),
                    );
                    compiled.filter_params.push(Value::Text(text.clone()));
                    compiled.filter_params.push(Value::Text(text.clone()));
                }
                Stage::OwnerFilter(owner) => {
                    compiled.filters.push("v.owner_id = ?".to_string());
                    compiled.filter_params.push(Value::Text(owner.to_string()));
                }
                Stage::PublishedFilter => compiled.filters.push("v.is_published = 1".to_string()),
                Stage::Sort { field, direction } => {
                    compiled.order_by = format!(
                        "ORDER BY {} {dir}, v.rowid {dir}",
                        field.column(),
                        dir = direction.keyword()
                    );
                }
                // Inner join: videos whose owner vanished drop out of the feed.
                Stage::OwnerJoin => compiled.from.push_str(" JOIN users u ON u.id = v.owner_id"),
                Stage::Paginate(page) => compiled.page = *page,
            }
        }
        compiled
    }
}

/// Feed entry: the video plus its owner's trimmed projection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: EntityId,
    pub title: String,
    pub description: String,
    pub video_file: AssetRef,
    pub thumbnail: AssetRef,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub owner_details: OwnerSummary,
}

/// Reads `VIDEO_COLUMNS` followed by `u.id, u.username, u.avatar_url`.
pub(crate) fn row_to_summary(row: &libsql::Row) -> CoreResult<VideoSummary> {
    let video = row_to_video(row)?;
    Ok(VideoSummary {
        id: video.id,
        title: video.title,
        description: video.description,
        video_file: video.video_file,
        thumbnail: video.thumbnail,
        duration: video.duration,
        views: video.views,
        is_published: video.is_published,
        created_at: video.created_at,
        owner_details: row_to_owner_summary(row, VIDEO_COLUMN_COUNT)?,
    })
}

impl Engine {
    /// Lists published videos as one page of summaries.
    pub async fn list_videos(&self, filter: &FeedFilter) -> CoreResult<Page<VideoSummary>> {
        let settings = self.settings();
        let pipeline =
            FeedPipeline::from_filter(filter, &settings.search_index, settings.page_size_max)?;
        self.run_feed(&pipeline).await
    }

    pub async fn run_feed(&self, pipeline: &FeedPipeline) -> CoreResult<Page<VideoSummary>> {
        let compiled = pipeline.compile();
        debug!(stages = ?pipeline.stage_names(), "running feed pipeline");
        let conn = self.store().conn();
        let where_clause = compiled.where_clause();

        let mut rows = conn
            .query(
                &format!("SELECT COUNT(*) FROM {} {where_clause}", compiled.from),
                Params::Positional(compiled.filter_params.clone()),
            )
            .await?;
        let total: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };

        let mut page_params = compiled.filter_params.clone();
        page_params.push(Value::Integer(i64::from(compiled.page.limit())));
        page_params.push(Value::Integer(compiled.page.offset() as i64));
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {VIDEO_COLUMNS}, u.id, u.username, u.avatar_url \
                     FROM {} {where_clause} {} LIMIT ? OFFSET ?",
                    compiled.from, compiled.order_by
                ),
                Params::Positional(page_params),
            )
            .await?;
        let mut docs = Vec::new();
        while let Some(row) = rows.next().await? {
            docs.push(row_to_summary(&row)?);
        }

        Ok(Page::new(docs, total.max(0) as u64, compiled.page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::temp_engine;
    use crate::store::test_support::{sample_video, seed_user};

    fn filter() -> FeedFilter {
        FeedFilter::default()
    }

    #[test]
    fn builder_order_is_fixed_regardless_of_call_order() {
        let owner = EntityId::generate();
        let a = FeedPipeline::builder()
            .sort(SortField::Views, SortDirection::Asc)
            .owner(owner)
            .search("idx", "cats")
            .build();
        let b = FeedPipeline::builder()
            .search("idx", "cats")
            .owner(owner)
            .sort(SortField::Views, SortDirection::Asc)
            .build();
        assert_eq!(a, b);
        assert_eq!(
            a.stage_names(),
            vec![
                "search",
                "owner-filter",
                "publication-filter",
                "sort",
                "owner-join",
                "paginate"
            ]
        );
    }

    #[test]
    fn minimal_pipeline_still_filters_sorts_and_joins() {
        let pipeline = FeedPipeline::builder().build();
        assert_eq!(
            pipeline.stage_names(),
            vec!["publication-filter", "sort", "owner-join", "paginate"]
        );
        assert!(pipeline.stages().contains(&Stage::Sort {
            field: SortField::CreatedAt,
            direction: SortDirection::Desc
        }));
    }

    #[test]
    fn from_filter_validates_inputs() {
        let bad_owner = FeedFilter {
            user_id: Some("nope".into()),
            ..filter()
        };
        assert!(matches!(
            FeedPipeline::from_filter(&bad_owner, "idx", 100),
            Err(CoreError::InvalidIdentifier(_))
        ));

        let bad_sort = FeedFilter {
            sort_by: Some("title; DROP TABLE videos".into()),
            sort_type: Some("asc".into()),
            ..filter()
        };
        assert!(matches!(
            FeedPipeline::from_filter(&bad_sort, "idx", 100),
            Err(CoreError::InvalidArgument(_))
        ));

        let bad_direction = FeedFilter {
            sort_by: Some("views".into()),
            sort_type: Some("sideways".into()),
            ..filter()
        };
        assert!(matches!(
            FeedPipeline::from_filter(&bad_direction, "idx", 100),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn sort_without_direction_falls_back_to_newest_first() {
        let only_field = FeedFilter {
            sort_by: Some("views".into()),
            ..filter()
        };
        let pipeline = FeedPipeline::from_filter(&only_field, "idx", 100).unwrap();
        assert!(pipeline.stages().contains(&Stage::Sort {
            field: SortField::CreatedAt,
            direction: SortDirection::Desc
        }));
    }

    #[tokio::test]
    async fn unpublished_videos_never_appear() {
        let (_dir, engine, _) = temp_engine().await;
        let owner = seed_user(engine.store(), "owner").await;
        let mut hidden = sample_video(owner.id, "hidden gem");
        hidden.is_published = false;
        engine.store().insert_video(&hidden).await.unwrap();
        let shown = sample_video(owner.id, "shown gem");
        engine.store().insert_video(&shown).await.unwrap();

        let filters = [
            filter(),
            FeedFilter {
                query: Some("gem".into()),
                ..filter()
            },
            FeedFilter {
                user_id: Some(owner.id.to_string()),
                sort_by: Some("views".into()),
                sort_type: Some("asc".into()),
                ..filter()
            },
        ];
        for f in &filters {
            let page = engine.list_videos(f).await.unwrap();
            assert_eq!(page.total_docs, 1);
            assert!(page.docs.iter().all(|doc| doc.id != hidden.id));
        }
    }

    #[tokio::test]
    async fn pagination_bounds_over_twenty_five_videos() {
        let (_dir, engine, _) = temp_engine().await;
        let owner = seed_user(engine.store(), "prolific").await;
        for i in 0..25 {
            let video = sample_video(owner.id, &format!("clip {i}"));
            engine.store().insert_video(&video).await.unwrap();
        }

        let first = engine
            .list_videos(&FeedFilter {
                page: Some(1),
                limit: Some(10),
                ..filter()
            })
            .await
            .unwrap();
        assert_eq!(first.docs.len(), 10);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.total_docs, 25);
        assert!(first.has_next_page);

        let last = engine
            .list_videos(&FeedFilter {
                page: Some(3),
                limit: Some(10),
                ..filter()
            })
            .await
            .unwrap();
        assert_eq!(last.docs.len(), 5);

        let beyond = engine
            .list_videos(&FeedFilter {
                page: Some(4),
                limit: Some(10),
                ..filter()
            })
            .await
            .unwrap();
        assert!(beyond.docs.is_empty());
        assert!(!beyond.has_next_page);
    }

    #[tokio::test]
    async fn default_order_is_newest_first() {
        let (_dir, engine, _) = temp_engine().await;
        let owner = seed_user(engine.store(), "owner").await;
        let mut old = sample_video(owner.id, "old");
        old.created_at = Utc::now() - chrono::Duration::days(2);
        engine.store().insert_video(&old).await.unwrap();
        let new = sample_video(owner.id, "new");
        engine.store().insert_video(&new).await.unwrap();

        let page = engine.list_videos(&filter()).await.unwrap();
        let ids: Vec<_> = page.docs.iter().map(|doc| doc.id).collect();
        assert_eq!(ids, vec![new.id, old.id]);
        assert_eq!(page.docs[0].owner_details.username, "owner");
    }

    #[tokio::test]
    async fn sorts_by_views_ascending() {
        let (_dir, engine, _) = temp_engine().await;
        let owner = seed_user(engine.store(), "owner").await;
        let mut ids = Vec::new();
        for views in [30, 10, 20] {
            let mut video = sample_video(owner.id, &format!("v{views}"));
            video.views = views;
            engine.store().insert_video(&video).await.unwrap();
            ids.push((views, video.id));
        }
        ids.sort();

        let page = engine
            .list_videos(&FeedFilter {
                sort_by: Some("views".into()),
                sort_type: Some("asc".into()),
                ..filter()
            })
            .await
            .unwrap();
        let got: Vec<_> = page.docs.iter().map(|doc| doc.views).collect();
        assert_eq!(got, vec![10, 20, 30]);
        assert_eq!(page.docs[0].id, ids[0].1);
    }

    #[tokio::test]
    async fn search_matches_title_or_description_only() {
        let (_dir, engine, _) = temp_engine().await;
        let owner = seed_user(engine.store(), "rustacean").await;
        let mut by_title = sample_video(owner.id, "Learning RUST");
        by_title.description = "a tutorial".into();
        let mut by_description = sample_video(owner.id, "Episode 2");
        by_description.description = "more rust today".into();
        let mut miss = sample_video(owner.id, "Cooking");
        miss.description = "pasta".into();
        for video in [&by_title, &by_description, &miss] {
            engine.store().insert_video(video).await.unwrap();
        }

        let page = engine
            .list_videos(&FeedFilter {
                query: Some("rust".into()),
                ..filter()
            })
            .await
            .unwrap();
        assert_eq!(page.total_docs, 2);
        assert!(page.docs.iter().all(|doc| doc.id != miss.id));

        // Owner usernames are not part of the searchable fields.
        let page = engine
            .list_videos(&FeedFilter {
                query: Some("rustacean".into()),
                ..filter()
            })
            .await
            .unwrap();
        assert_eq!(page.total_docs, 0);
    }

    #[tokio::test]
    async fn owner_filter_and_orphaned_owner() {
        let (_dir, engine, _) = temp_engine().await;
        let alice = seed_user(engine.store(), "alice").await;
        let bob = seed_user(engine.store(), "bob").await;
        engine
            .store()
            .insert_video(&sample_video(alice.id, "a1"))
            .await
            .unwrap();
        engine
            .store()
            .insert_video(&sample_video(bob.id, "b1"))
            .await
            .unwrap();
        engine
            .store()
            .insert_video(&sample_video(EntityId::generate(), "orphan"))
            .await
            .unwrap();

        let all = engine.list_videos(&filter()).await.unwrap();
        assert_eq!(all.total_docs, 2);

        let page = engine
            .list_videos(&FeedFilter {
                user_id: Some(alice.id.to_string()),
                ..filter()
            })
            .await
            .unwrap();
        assert_eq!(page.total_docs, 1);
        assert_eq!(page.docs[0].owner_details.id, alice.id);
    }
}
