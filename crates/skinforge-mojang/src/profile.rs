//! Signed profile payloads and texture descriptor decoding.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// A signed profile from the session server.
#[derive(Debug, Clone, Deserialize)]
pub struct SignedProfile {
    /// Profile UUID without hyphens.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub properties: Vec<ProfileProperty>,
}

/// One `properties` entry; the texture descriptor lives under `textures`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileProperty {
    pub name: String,
    /// Base64-encoded JSON payload.
    pub value: String,
    pub signature: Option<String>,
}

impl SignedProfile {
    /// The `textures` property, if the profile carries one.
    pub fn textures_property(&self) -> Option<&ProfileProperty> {
        self.properties.iter().find(|p| p.name == "textures")
    }
}

/// Errors from texture descriptor decoding.
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("texture property is not valid base64")]
    Base64,
    #[error("texture payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The fields we need out of a decoded texture payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTextures {
    /// URL of the stored skin image, when the profile has a skin.
    pub skin_url: Option<String>,
    /// Whether the upstream flagged the skin as the slim model.
    pub slim_model: bool,
}

// Wire shape of the base64 payload:
// {"textures":{"SKIN":{"url":"…","metadata":{"model":"slim"}}}}
#[derive(Deserialize)]
struct TexturePayload {
    #[serde(default)]
    textures: TextureMap,
}

#[derive(Deserialize, Default)]
struct TextureMap {
    #[serde(rename = "SKIN")]
    skin: Option<SkinTexture>,
}

#[derive(Deserialize)]
struct SkinTexture {
    url: String,
    metadata: Option<SkinMetadata>,
}

#[derive(Deserialize)]
struct SkinMetadata {
    model: Option<String>,
}

/// Decode a base64 `textures` property value.
pub fn decode_textures(value: &str) -> Result<DecodedTextures, TextureError> {
    let raw = BASE64.decode(value).map_err(|_| TextureError::Base64)?;
    let payload: TexturePayload = serde_json::from_slice(&raw)?;

    let (skin_url, slim_model) = match payload.textures.skin {
        Some(skin) => {
            let slim = skin
                .metadata
                .and_then(|m| m.model)
                .is_some_and(|m| m == "slim");
            (Some(skin.url), slim)
        }
        None => (None, false),
    };

    Ok(DecodedTextures {
        skin_url,
        slim_model,
    })
}
