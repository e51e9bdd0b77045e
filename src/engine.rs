#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::{
    assets::{AssetStore, LocalAssetStore},
    config::{DEFAULT_PAGE_SIZE_MAX, DEFAULT_SEARCH_INDEX, RuntimeConfig},
    store::EntityStore,
};

/// Knobs the core operations read at call time.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub search_index: String,
    pub page_size_max: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            search_index: DEFAULT_SEARCH_INDEX.to_string(),
            page_size_max: DEFAULT_PAGE_SIZE_MAX,
        }
    }
}

/// Request-scoped entry point for every core operation. Cheap to clone;
/// holds no per-request state.
#[derive(Clone)]
pub struct Engine {
    store: EntityStore,
    assets: Arc<dyn AssetStore>,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(store: EntityStore, assets: Arc<dyn AssetStore>, settings: EngineSettings) -> Self {
        Self {
            store,
            assets,
            settings,
        }
    }

    /// Opens the entity store and the local asset directory named by `config`.
    pub async fn open(config: &RuntimeConfig) -> Result<Self> {
        let store = EntityStore::open(&config.database)
            .await
            .context("initializing entity store")?;
        info!(
            database = %config.database.display(),
            asset_root = %config.asset_root.display(),
            "engine ready"
        );
        Ok(Self::new(
            store,
            Arc::new(LocalAssetStore::new(config.asset_root.clone())),
            EngineSettings {
                search_index: config.search_index.clone(),
                page_size_max: config.page_size_max,
            },
        ))
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub(crate) fn assets(&self) -> &dyn AssetStore {
        self.assets.as_ref()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}
