//! Duplicate detection probes with counter bookkeeping.
//!
//! Each probe runs at the earliest point its input is known: the source-URL
//! probe before any download, the user-UUID probe before any profile fetch,
//! and the image-hash probe right after validation. A hit bumps the stored
//! duplicate counter and short-circuits the rest of the pipeline.

use std::sync::Arc;

use skinforge_core::types::DuplicateSource;
use skinforge_core::urls::{self, KnownSkinUrl};
use skinforge_db::catalog::Catalog;
use skinforge_db::models::skin::{Skin, SkinFilter};

use super::EngineError;

/// Runs the three catalog probes.
pub struct DuplicateDetector {
    catalog: Arc<dyn Catalog>,
}

impl DuplicateDetector {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Probe an input URL for a known catalog link or stored texture URL.
    pub async fn probe_source_url(
        &self,
        url: &str,
        filter: &SkinFilter,
    ) -> Result<Option<(Skin, DuplicateSource)>, EngineError> {
        let hit = match urls::classify(url) {
            Some(KnownSkinUrl::CatalogId(id)) => self
                .catalog
                .find_skin_by_id(id, filter)
                .await?
                .map(|skin| (skin, DuplicateSource::MineskinUrl)),
            Some(KnownSkinUrl::Texture { url, hash }) => self
                .catalog
                .find_skin_by_texture(&url, &hash, filter)
                .await?
                .map(|skin| (skin, DuplicateSource::TextureUrl)),
            None => None,
        };
        self.register(hit).await
    }

    /// Probe a requested user UUID (long form) for a stored skin.
    pub async fn probe_user_uuid(
        &self,
        long_uuid: &str,
        filter: &SkinFilter,
    ) -> Result<Option<(Skin, DuplicateSource)>, EngineError> {
        let hit = self
            .catalog
            .find_skin_by_uuid(long_uuid, filter)
            .await?
            .map(|skin| (skin, DuplicateSource::UserUuid));
        self.register(hit).await
    }

    /// Probe a computed perceptual hash for a stored skin.
    pub async fn probe_image_hash(
        &self,
        phash: &str,
        filter: &SkinFilter,
    ) -> Result<Option<(Skin, DuplicateSource)>, EngineError> {
        let hit = self
            .catalog
            .find_skin_by_hash(phash, filter)
            .await?
            .map(|skin| (skin, DuplicateSource::ImageHash));
        self.register(hit).await
    }

    /// Bump the duplicate counter for a hit and tag it for observability.
    async fn register(
        &self,
        hit: Option<(Skin, DuplicateSource)>,
    ) -> Result<Option<(Skin, DuplicateSource)>, EngineError> {
        let Some((skin, source)) = hit else {
            return Ok(None);
        };

        // The counter bump is best-effort; a raced delete still returns the
        // skin we already loaded.
        let updated = self
            .catalog
            .increment_duplicate(skin.id)
            .await?
            .unwrap_or(skin);

        tracing::info!(
            skin_id = updated.id,
            source = source.as_str(),
            duplicate_count = updated.duplicate_count,
            "Duplicate detected",
        );
        Ok(Some((updated, source)))
    }
}
