//! Skin image validation and model-variant inference.
//!
//! Accepts raw upload/download bytes and enforces the byte-exact constraints
//! a skin texture must satisfy before it is sent upstream: size bounds, PNG
//! format, 64x32 or 64x64 geometry, and (when the caller did not pick a
//! model) variant detection from the arm alpha region.

use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::error::GenerateError;
use crate::types::SkinVariant;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Smallest plausible skin PNG, in bytes.
pub const MIN_IMAGE_BYTES: usize = 100;

/// Largest accepted skin PNG, in bytes.
pub const MAX_IMAGE_BYTES: usize = 20_000;

/// Required texture width in pixels.
pub const SKIN_WIDTH: u32 = 64;

/// Accepted texture heights in pixels.
pub const SKIN_HEIGHTS: [u32; 2] = [32, 64];

/// The only accepted content type.
pub const PNG_MIME: &str = "image/png";

/// Arm overlay columns inspected for variant detection: x in [54, 56).
const ARM_X: std::ops::Range<u32> = 54..56;

/// Arm overlay rows inspected for variant detection: y in [20, 32).
const ARM_Y: std::ops::Range<u32> = 20..32;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A successfully validated skin image.
#[derive(Debug)]
pub struct ValidatedImage {
    pub width: u32,
    pub height: u32,
    /// Detected content type (always `image/png` on success).
    pub mime: &'static str,
    /// The requested variant, or the inferred one when the request said
    /// `Unknown`.
    pub variant: SkinVariant,
    /// The decoded pixel data, kept so the perceptual hash does not need a
    /// second decode pass.
    pub image: DynamicImage,
}

/// Validate raw image bytes against the skin texture constraints.
///
/// `requested` is the variant from the generation options; it is only
/// overwritten when it is [`SkinVariant::Unknown`].
pub fn validate(bytes: &[u8], requested: SkinVariant) -> Result<ValidatedImage, GenerateError> {
    if bytes.len() < MIN_IMAGE_BYTES || bytes.len() > MAX_IMAGE_BYTES {
        return Err(GenerateError::InvalidImage(format!(
            "image size must be between {MIN_IMAGE_BYTES} and {MAX_IMAGE_BYTES} bytes, got {}",
            bytes.len()
        )));
    }

    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => {}
        _ => {
            return Err(GenerateError::InvalidImage(
                format!("content type must be {PNG_MIME}"),
            ));
        }
    }

    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| GenerateError::InvalidImage(format!("failed to decode PNG: {e}")))?;

    let (width, height) = img.dimensions();
    if width != SKIN_WIDTH || !SKIN_HEIGHTS.contains(&height) {
        return Err(GenerateError::InvalidImage(format!(
            "invalid dimensions: {width}x{height}"
        )));
    }

    let variant = match requested {
        SkinVariant::Unknown => infer_variant(&img, height),
        explicit => explicit,
    };

    Ok(ValidatedImage {
        width,
        height,
        mime: PNG_MIME,
        variant,
        image: img,
    })
}

/// Infer the model variant from the texture geometry.
///
/// Legacy 64x32 textures predate the slim model and are always classic.
/// For 64x64 textures the second arm layer at (54..56, 20..32) is fully
/// opaque on classic skins; any transparency there means slim.
fn infer_variant(img: &DynamicImage, height: u32) -> SkinVariant {
    if height == 32 {
        return SkinVariant::Classic;
    }

    let rgba = img.to_rgba8();
    for y in ARM_Y {
        for x in ARM_X.clone() {
            if rgba.get_pixel(x, y)[3] != u8::MAX {
                return SkinVariant::Slim;
            }
        }
    }
    SkinVariant::Classic
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
