//! The storage abstraction consumed by the generation engine.
//!
//! The engine never talks to a concrete store: it holds an
//! `Arc<dyn Catalog>`. [`PgCatalog`] is the production implementation over
//! the repository layer; tests supply an in-memory one.

use async_trait::async_trait;
use skinforge_core::types::DbId;

use crate::models::account::Account;
use crate::models::skin::{CreateSkin, Skin, SkinFilter};
use crate::repositories::{AccountRepo, SkinRepo};
use crate::DbPool;

/// Errors from a catalog backend.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness conflict (most importantly on `skins.id`).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A non-sqlx backend error (in-memory or future stores).
    #[error("Catalog backend error: {0}")]
    Backend(String),
}

/// Read/update/insert operations over the skin catalog and account pool.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Look up a skin by public ID within the identity filter.
    async fn find_skin_by_id(
        &self,
        id: DbId,
        filter: &SkinFilter,
    ) -> Result<Option<Skin>, CatalogError>;

    /// Look up a skin by stored texture URL or texture hash within the
    /// identity filter.
    async fn find_skin_by_texture(
        &self,
        texture_url: &str,
        texture_hash: &str,
        filter: &SkinFilter,
    ) -> Result<Option<Skin>, CatalogError>;

    /// Look up a skin by owning profile UUID within the identity filter.
    async fn find_skin_by_uuid(
        &self,
        uuid: &str,
        filter: &SkinFilter,
    ) -> Result<Option<Skin>, CatalogError>;

    /// Look up a skin by perceptual hash within the identity filter.
    async fn find_skin_by_hash(
        &self,
        phash: &str,
        filter: &SkinFilter,
    ) -> Result<Option<Skin>, CatalogError>;

    /// Persist a freshly generated skin.
    ///
    /// Returns [`CatalogError::Conflict`] when the public ID is already
    /// taken; the allocator treats that as a signal to redraw.
    async fn insert_skin(&self, input: &CreateSkin) -> Result<Skin, CatalogError>;

    /// Whether a public ID is already taken.
    async fn exists_skin_id(&self, id: DbId) -> Result<bool, CatalogError>;

    /// Best-effort duplicate-counter bump; returns the updated skin.
    async fn increment_duplicate(&self, id: DbId) -> Result<Option<Skin>, CatalogError>;

    /// Find the best eligible account for `server_name`, excluding `locked`.
    async fn find_eligible_account(
        &self,
        server_name: &str,
        error_threshold: i32,
        locked: &[DbId],
        now_sec: i64,
    ) -> Result<Option<Account>, CatalogError>;

    /// Persist the engine-mutable fields of an account.
    async fn update_account(&self, account: &Account) -> Result<(), CatalogError>;

    /// Count globally usable accounts (feeds the request-pacing hint).
    async fn count_usable_accounts(&self, error_threshold: i32) -> Result<i64, CatalogError>;

    /// Backend reachability, for the health endpoint.
    async fn health_check(&self) -> bool;
}

/// PostgreSQL-backed catalog.
pub struct PgCatalog {
    pool: DbPool,
}

impl PgCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn find_skin_by_id(
        &self,
        id: DbId,
        filter: &SkinFilter,
    ) -> Result<Option<Skin>, CatalogError> {
        Ok(SkinRepo::find_by_id(&self.pool, id, filter).await?)
    }

    async fn find_skin_by_texture(
        &self,
        texture_url: &str,
        texture_hash: &str,
        filter: &SkinFilter,
    ) -> Result<Option<Skin>, CatalogError> {
        Ok(SkinRepo::find_by_texture(&self.pool, texture_url, texture_hash, filter).await?)
    }

    async fn find_skin_by_uuid(
        &self,
        uuid: &str,
        filter: &SkinFilter,
    ) -> Result<Option<Skin>, CatalogError> {
        Ok(SkinRepo::find_by_uuid(&self.pool, uuid, filter).await?)
    }

    async fn find_skin_by_hash(
        &self,
        phash: &str,
        filter: &SkinFilter,
    ) -> Result<Option<Skin>, CatalogError> {
        Ok(SkinRepo::find_by_hash(&self.pool, phash, filter).await?)
    }

    async fn insert_skin(&self, input: &CreateSkin) -> Result<Skin, CatalogError> {
        SkinRepo::insert(&self.pool, input)
            .await
            .map_err(|e| match &e {
                // PostgreSQL unique violation: error code 23505.
                sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                    CatalogError::Conflict(format!("skin id {} already exists", input.id))
                }
                _ => CatalogError::Database(e),
            })
    }

    async fn exists_skin_id(&self, id: DbId) -> Result<bool, CatalogError> {
        Ok(SkinRepo::exists_id(&self.pool, id).await?)
    }

    async fn increment_duplicate(&self, id: DbId) -> Result<Option<Skin>, CatalogError> {
        Ok(SkinRepo::increment_duplicate(&self.pool, id).await?)
    }

    async fn find_eligible_account(
        &self,
        server_name: &str,
        error_threshold: i32,
        locked: &[DbId],
        now_sec: i64,
    ) -> Result<Option<Account>, CatalogError> {
        Ok(AccountRepo::find_eligible(&self.pool, server_name, error_threshold, locked, now_sec)
            .await?)
    }

    async fn update_account(&self, account: &Account) -> Result<(), CatalogError> {
        Ok(AccountRepo::update(&self.pool, account).await?)
    }

    async fn count_usable_accounts(&self, error_threshold: i32) -> Result<i64, CatalogError> {
        Ok(AccountRepo::count_usable(&self.pool, error_threshold).await?)
    }

    async fn health_check(&self) -> bool {
        crate::health_check(&self.pool).await.is_ok()
    }
}
