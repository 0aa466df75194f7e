//! Canonical metric and observability tag constants.
//!
//! These names appear as structured tracing fields; keeping them here means
//! the engine, the API layer, and any log-based dashboards agree on spelling.

/// Duration of a full generation request, in milliseconds.
pub const METRIC_GENERATE_DURATION: &str = "generate_duration_ms";

/// Input adapter tag: generation from a remote URL.
pub const INPUT_URL: &str = "url";

/// Input adapter tag: generation from an uploaded file.
pub const INPUT_UPLOAD: &str = "upload";

/// Input adapter tag: generation from an existing user UUID.
pub const INPUT_USER: &str = "user";

/// Duplicate counter source: input URL matched an existing catalog entry.
pub const DUPLICATE_SOURCE_MINESKIN_URL: &str = "mineskin_url";

/// Duplicate counter source: input URL matched a stored upstream texture URL.
pub const DUPLICATE_SOURCE_TEXTURE_URL: &str = "texture_url";

/// Duplicate counter source: requested user UUID already owns a stored skin.
pub const DUPLICATE_SOURCE_USER_UUID: &str = "user_uuid";

/// Duplicate counter source: perceptual hash matched a stored skin.
pub const DUPLICATE_SOURCE_IMAGE_HASH: &str = "image_hash";
