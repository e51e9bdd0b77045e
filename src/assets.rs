#![forbid(unsafe_code)]

//! Remote asset storage seam. Uploading happens before the core runs; the
//! core only ever asks for assets to be removed.

use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    error::{CoreError, CoreResult},
    model::AssetRef,
};

const VIDEOS_SUBDIR: &str = "videos";
const IMAGES_SUBDIR: &str = "images";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Video,
    Image,
}

impl AssetKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Image => "image",
        }
    }
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Removes the asset. An asset that is already gone counts as removed.
    async fn delete(&self, asset: &AssetRef, kind: AssetKind) -> CoreResult<()>;
}

/// Assets kept as plain files below `root`, one subdirectory per kind,
/// named after their public id.
#[derive(Debug, Clone)]
pub struct LocalAssetStore {
    root: PathBuf,
}

impl LocalAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves the on-disk location of `asset`, rejecting ids that would
    /// escape the kind directory.
    pub fn path_for(&self, asset: &AssetRef, kind: AssetKind) -> CoreResult<PathBuf> {
        ensure_safe_path_segment(&asset.public_id)?;
        let dir = match kind {
            AssetKind::Video => VIDEOS_SUBDIR,
            AssetKind::Image => IMAGES_SUBDIR,
        };
        Ok(self.root.join(dir).join(&asset.public_id))
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn delete(&self, asset: &AssetRef, kind: AssetKind) -> CoreResult<()> {
        let path = self.path_for(asset, kind)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(public_id = %asset.public_id, kind = kind.label(), "asset removed");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(public_id = %asset.public_id, "asset already absent");
                Ok(())
            }
            Err(err) => Err(CoreError::UpstreamFailure(format!(
                "removing {} {}: {err}",
                kind.label(),
                asset.public_id
            ))),
        }
    }
}

/// Validates that a single dynamic path segment never escapes its base folder.
fn ensure_safe_path_segment(value: &str) -> CoreResult<()> {
    if value.is_empty()
        || Path::new(value)
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        || value.contains('/')
        || value.contains('\\')
    {
        return Err(CoreError::InvalidArgument(format!(
            "invalid asset id {value:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn delete_removes_file_and_tolerates_missing() {
        let dir = tempdir().unwrap();
        let store = LocalAssetStore::new(dir.path());
        let asset = AssetRef::new("https://cdn.test/clip.mp4", "clip.mp4");
        let path = store.path_for(&asset, AssetKind::Video).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"bytes").unwrap();

        store.delete(&asset, AssetKind::Video).await.unwrap();
        assert!(!path.exists());
        store.delete(&asset, AssetKind::Video).await.unwrap();
    }

    #[tokio::test]
    async fn kinds_live_in_separate_directories() {
        let dir = tempdir().unwrap();
        let store = LocalAssetStore::new(dir.path());
        let asset = AssetRef::new("https://cdn.test/a", "same-id");
        let video = store.path_for(&asset, AssetKind::Video).unwrap();
        let image = store.path_for(&asset, AssetKind::Image).unwrap();
        assert_ne!(video, image);
        assert!(image.starts_with(dir.path().join("images")));
    }

    #[test]
    fn path_for_rejects_traversal() {
        let store = LocalAssetStore::new("/assets");
        for bad in ["../secret", "", "a/b", "/etc/passwd", ".."] {
            let asset = AssetRef::new("https://cdn.test/x", bad);
            let err = store.path_for(&asset, AssetKind::Image).unwrap_err();
            assert!(matches!(err, CoreError::InvalidArgument(_)), "{bad}");
        }
    }
}
