//! The generation engine: everything between a validated request and a
//! persisted catalog entry.
//!
//! - [`scheduler`] — exclusive selection over the shared account pool
//! - [`authenticator`] — per-account token lifecycle against the upstream
//! - [`detector`] — three-stage duplicate probes with counter bookkeeping
//! - [`ids`] — catalog-checked public-ID allocation
//! - [`tempfiles`] — scoped on-disk buffers for downloads
//! - [`generator`] — the end-to-end pipeline for URL/upload/user inputs

use skinforge_core::error::GenerateError;
use skinforge_core::types::{SkinVariant, SkinVisibility};
use skinforge_db::catalog::CatalogError;
use skinforge_db::models::skin::SkinFilter;

pub mod authenticator;
pub mod detector;
pub mod generator;
pub mod ids;
pub mod scheduler;
pub mod tempfiles;

/// A failure inside the engine.
///
/// Domain failures carry the public taxonomy; catalog and I/O failures are
/// infrastructure errors the API layer reports as internal.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// User-supplied metadata for a generation request.
///
/// The tuple `(name, variant, visibility)` is part of skin identity: the
/// duplicate probes filter on all three.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub name: String,
    pub variant: SkinVariant,
    pub visibility: SkinVisibility,
}

impl GenerateOptions {
    /// The identity filter applied by every duplicate probe.
    pub fn filter(&self) -> SkinFilter {
        SkinFilter {
            name: self.name.clone(),
            variant: self.variant,
            visibility: self.visibility,
        }
    }
}

/// Request provenance recorded on the persisted skin.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub user_agent: String,
    pub via: String,
    /// Origin IP of the end-user request, forwarded upstream when the
    /// account has no pinned request IP.
    pub ip: Option<String>,
}
