//! Repository for the `skins` table.

use skinforge_core::types::DbId;
use sqlx::PgPool;

use crate::models::skin::{CreateSkin, Skin, SkinFilter};

/// Column list for `skins` queries.
const COLUMNS: &str = "\
    id, name, uuid, variant, visibility, phash, value, signature, \
    texture_url, texture_hash, mojang_hash, created_at, generate_duration_ms, \
    account_id, duplicate_count, view_count, via, user_agent, source";

/// Identity-filter fragment shared by every duplicate probe.
/// Binds `name`, `variant`, `visibility` as `$1..$3`.
const FILTER: &str = "name = $1 AND variant = $2 AND visibility = $3";

/// Provides lookup and insert operations for catalog skins.
pub struct SkinRepo;

impl SkinRepo {
    // ── Duplicate probes ─────────────────────────────────────────────────

    /// Find a skin by its public ID, within the identity filter.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
        filter: &SkinFilter,
    ) -> Result<Option<Skin>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM skins WHERE {FILTER} AND id = $4");
        sqlx::query_as::<_, Skin>(&query)
            .bind(&filter.name)
            .bind(filter.variant)
            .bind(filter.visibility)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a skin whose stored texture URL or texture hash matches,
    /// within the identity filter.
    pub async fn find_by_texture(
        pool: &PgPool,
        texture_url: &str,
        texture_hash: &str,
        filter: &SkinFilter,
    ) -> Result<Option<Skin>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM skins \
             WHERE {FILTER} AND (texture_url = $4 OR texture_hash = $5) \
             ORDER BY created_at ASC LIMIT 1"
        );
        sqlx::query_as::<_, Skin>(&query)
            .bind(&filter.name)
            .bind(filter.variant)
            .bind(filter.visibility)
            .bind(texture_url)
            .bind(texture_hash)
            .fetch_optional(pool)
            .await
    }

    /// Find a skin by owning profile UUID, within the identity filter.
    pub async fn find_by_uuid(
        pool: &PgPool,
        uuid: &str,
        filter: &SkinFilter,
    ) -> Result<Option<Skin>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM skins \
             WHERE {FILTER} AND uuid = $4 \
             ORDER BY created_at ASC LIMIT 1"
        );
        sqlx::query_as::<_, Skin>(&query)
            .bind(&filter.name)
            .bind(filter.variant)
            .bind(filter.visibility)
            .bind(uuid)
            .fetch_optional(pool)
            .await
    }

    /// Find a skin by perceptual hash, within the identity filter.
    pub async fn find_by_hash(
        pool: &PgPool,
        phash: &str,
        filter: &SkinFilter,
    ) -> Result<Option<Skin>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM skins \
             WHERE {FILTER} AND phash = $4 \
             ORDER BY created_at ASC LIMIT 1"
        );
        sqlx::query_as::<_, Skin>(&query)
            .bind(&filter.name)
            .bind(filter.variant)
            .bind(filter.visibility)
            .bind(phash)
            .fetch_optional(pool)
            .await
    }

    // ── ID allocation support ────────────────────────────────────────────

    /// Whether a public ID is already taken.
    pub async fn exists_id(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM skins WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }

    // ── Mutations ────────────────────────────────────────────────────────

    /// Insert a freshly generated skin. Counters start at zero and
    /// `created_at` defaults to the insertion time.
    pub async fn insert(pool: &PgPool, input: &CreateSkin) -> Result<Skin, sqlx::Error> {
        let query = format!(
            "INSERT INTO skins (id, name, uuid, variant, visibility, phash, value, signature, \
                texture_url, texture_hash, mojang_hash, generate_duration_ms, account_id, \
                via, user_agent, source)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Skin>(&query)
            .bind(input.id)
            .bind(&input.name)
            .bind(&input.uuid)
            .bind(input.variant)
            .bind(input.visibility)
            .bind(&input.phash)
            .bind(&input.value)
            .bind(&input.signature)
            .bind(&input.texture_url)
            .bind(&input.texture_hash)
            .bind(&input.mojang_hash)
            .bind(input.generate_duration_ms)
            .bind(input.account_id)
            .bind(&input.via)
            .bind(&input.user_agent)
            .bind(&input.source)
            .fetch_one(pool)
            .await
    }

    /// Bump the duplicate counter and return the updated row.
    ///
    /// Atomic in PostgreSQL; concurrent hits never drop the record, and
    /// counter precision is best-effort by design.
    pub async fn increment_duplicate(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Skin>, sqlx::Error> {
        let query = format!(
            "UPDATE skins SET duplicate_count = duplicate_count + 1 \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Skin>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
