//! Shared type aliases and domain enums.

use serde::{Deserialize, Serialize};

/// All database primary keys are PostgreSQL BIGINT.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Skin model geometry.
///
/// `Classic` is the 4-px-arm model, `Slim` the 3-px-arm model. `Unknown`
/// means the caller did not specify a model and the image validator decides
/// from the arm alpha region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SkinVariant {
    Classic,
    Slim,
    Unknown,
}

impl SkinVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkinVariant::Classic => "classic",
            SkinVariant::Slim => "slim",
            SkinVariant::Unknown => "unknown",
        }
    }
}

impl Default for SkinVariant {
    fn default() -> Self {
        SkinVariant::Unknown
    }
}

impl std::fmt::Display for SkinVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SkinVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classic" => Ok(SkinVariant::Classic),
            "slim" => Ok(SkinVariant::Slim),
            "unknown" | "" => Ok(SkinVariant::Unknown),
            other => Err(format!("unknown skin variant '{other}'")),
        }
    }
}

/// Whether a generated skin is listed publicly or only reachable by ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SkinVisibility {
    Public,
    Private,
}

impl SkinVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkinVisibility::Public => "public",
            SkinVisibility::Private => "private",
        }
    }
}

impl Default for SkinVisibility {
    fn default() -> Self {
        SkinVisibility::Public
    }
}

impl std::fmt::Display for SkinVisibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SkinVisibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" | "" => Ok(SkinVisibility::Public),
            "private" => Ok(SkinVisibility::Private),
            other => Err(format!("unknown visibility '{other}'")),
        }
    }
}

/// Which duplicate probe matched an existing catalog entry.
///
/// Emitted as an observability tag whenever a generation request resolves to
/// an already-known skin instead of an upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateSource {
    /// The input URL pointed at an existing catalog entry.
    MineskinUrl,
    /// The input URL was a canonical upstream texture URL already stored.
    TextureUrl,
    /// The requested user UUID already owns a stored skin.
    UserUuid,
    /// The validated image bytes hashed to a stored perceptual hash.
    ImageHash,
}

impl DuplicateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateSource::MineskinUrl => crate::metric_names::DUPLICATE_SOURCE_MINESKIN_URL,
            DuplicateSource::TextureUrl => crate::metric_names::DUPLICATE_SOURCE_TEXTURE_URL,
            DuplicateSource::UserUuid => crate::metric_names::DUPLICATE_SOURCE_USER_UUID,
            DuplicateSource::ImageHash => crate::metric_names::DUPLICATE_SOURCE_IMAGE_HASH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SkinVariant::Classic).unwrap(),
            "\"classic\""
        );
        assert_eq!(
            serde_json::to_string(&SkinVariant::Slim).unwrap(),
            "\"slim\""
        );
    }

    #[test]
    fn variant_round_trips_through_serde() {
        let v: SkinVariant = serde_json::from_str("\"slim\"").unwrap();
        assert_eq!(v, SkinVariant::Slim);
    }

    #[test]
    fn defaults_are_unknown_and_public() {
        assert_eq!(SkinVariant::default(), SkinVariant::Unknown);
        assert_eq!(SkinVisibility::default(), SkinVisibility::Public);
    }
}
