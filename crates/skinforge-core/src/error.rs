//! Generation error taxonomy.
//!
//! Every failure the engine can surface to a caller maps to exactly one of
//! these variants. The stable `error_type()` strings are part of the public
//! API contract; HTTP status mapping lives in the API layer.

/// A failure while processing a generation request.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The public-ID space yielded only collisions within the retry budget.
    #[error("Failed to allocate a new skin id after {0} attempts")]
    FailedToCreateId(u32),

    /// No upstream account passed the eligibility predicate.
    #[error("No upstream account available")]
    NoAccountAvailable,

    /// The upstream skin-change endpoint returned a non-2xx response.
    #[error("Upstream skin change failed: {0}")]
    SkinChangeFailed(String),

    /// Size, MIME, or dimension violation in the input image.
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// The input URL could not be followed or its host is not allowlisted.
    #[error("Invalid image URL: {0}")]
    InvalidImageUrl(String),

    /// The upstream profile is missing the skin texture data.
    #[error("Upstream profile has no skin texture data")]
    InvalidSkinData,

    /// Login, refresh, and validate all failed for the selected account.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The stored account password could not be decrypted.
    #[error("Stored credential could not be decrypted")]
    CredentialUnreadable,
}

impl GenerateError {
    /// Stable machine-readable tag for the response envelope.
    pub fn error_type(&self) -> &'static str {
        match self {
            GenerateError::FailedToCreateId(_) => "failed_to_create_id",
            GenerateError::NoAccountAvailable => "no_account_available",
            GenerateError::SkinChangeFailed(_) => "skin_change_failed",
            GenerateError::InvalidImage(_) => "invalid_image",
            GenerateError::InvalidImageUrl(_) => "invalid_image_url",
            GenerateError::InvalidSkinData => "invalid_skin_data",
            GenerateError::Auth(_) => "auth_failure",
            GenerateError::CredentialUnreadable => "credential_unreadable",
        }
    }
}
