//! Classification of known skin URL shapes.
//!
//! Two URL families short-circuit a generation request before any download:
//! links into our own catalog (`…mineskin.org/<id>`) and canonical upstream
//! texture URLs (`textures.minecraft.net/texture/<hash>`).

use std::sync::LazyLock;

use regex::Regex;

use crate::types::DbId;

static CATALOG_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.|api\.)?mineskin\.org/(?:skin/)?([0-9]+)/?$")
        .expect("catalog URL regex must compile")
});

static TEXTURE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://textures\.minecraft\.net/texture/([0-9a-z]+)$")
        .expect("texture URL regex must compile")
});

/// A URL recognized as already pointing at known skin data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnownSkinUrl {
    /// A link into our own catalog, carrying the public skin ID.
    CatalogId(DbId),
    /// A canonical upstream texture URL and its trailing hash segment.
    Texture { url: String, hash: String },
}

/// Classify a URL, returning `None` for anything that needs a real download.
pub fn classify(url: &str) -> Option<KnownSkinUrl> {
    if let Some(caps) = CATALOG_URL_RE.captures(url) {
        // IDs longer than i64 are not valid catalog links.
        return caps[1].parse::<DbId>().ok().map(KnownSkinUrl::CatalogId);
    }
    if let Some(caps) = TEXTURE_URL_RE.captures(url) {
        return Some(KnownSkinUrl::Texture {
            url: url.to_string(),
            hash: caps[1].to_string(),
        });
    }
    None
}

/// Extract the trailing hash segment of a canonical texture URL.
///
/// Returns `None` for any other URL shape, which keeps the stored
/// `texture_hash` column empty unless the URL is canonical.
pub fn texture_hash(url: &str) -> Option<String> {
    TEXTURE_URL_RE
        .captures(url)
        .map(|caps| caps[1].to_string())
}
