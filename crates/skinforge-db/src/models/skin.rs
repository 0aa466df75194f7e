//! Skin catalog entity model and DTOs.

use serde::{Deserialize, Serialize};
use skinforge_core::types::{DbId, SkinVariant, SkinVisibility, Timestamp};
use sqlx::FromRow;

/// A skin row from the `skins` table.
///
/// `value`, `signature`, and `texture_url` are immutable once persisted;
/// only the two counters mutate afterwards.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Skin {
    /// Public ID, allocated through the bijective encoder.
    pub id: DbId,
    pub name: String,
    /// Owning account profile UUID (long form) at creation time.
    pub uuid: String,
    pub variant: SkinVariant,
    pub visibility: SkinVisibility,
    /// Perceptual hash of the input pixels.
    pub phash: String,
    /// Signed texture descriptor from the upstream profile service.
    pub value: String,
    pub signature: String,
    pub texture_url: String,
    /// Last path segment of `texture_url` when it is a canonical texture URL.
    pub texture_hash: Option<String>,
    /// Perceptual hash of the image the upstream actually stored.
    pub mojang_hash: Option<String>,
    #[serde(rename = "timestamp")]
    pub created_at: Timestamp,
    pub generate_duration_ms: i64,
    /// Pool account that produced this skin.
    pub account_id: DbId,
    pub duplicate_count: i64,
    pub view_count: i64,
    pub via: String,
    pub user_agent: String,
    /// Request provenance: source URL, `upload`, or the requested user UUID.
    pub source: String,
}

/// DTO for inserting a freshly generated skin.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSkin {
    pub id: DbId,
    pub name: String,
    pub uuid: String,
    pub variant: SkinVariant,
    pub visibility: SkinVisibility,
    pub phash: String,
    pub value: String,
    pub signature: String,
    pub texture_url: String,
    pub texture_hash: Option<String>,
    pub mojang_hash: Option<String>,
    pub generate_duration_ms: i64,
    pub account_id: DbId,
    pub via: String,
    pub user_agent: String,
    pub source: String,
}

/// The identity filter applied by every duplicate probe.
///
/// Two uploads of identical pixels under different names, variants, or
/// visibilities are distinct catalog entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkinFilter {
    pub name: String,
    pub variant: SkinVariant,
    pub visibility: SkinVisibility,
}
