//! Repository for the `accounts` table.

use skinforge_core::types::DbId;
use sqlx::PgPool;

use crate::models::account::Account;

/// Column list for `accounts` queries.
const COLUMNS: &str = "\
    id, username, encrypted_password, encrypted_security_answer, \
    client_token, access_token, request_ip, request_server, \
    last_used_sec, last_selected_sec, forced_timeout_at_sec, time_added_sec, \
    error_counter, success_counter, total_error_counter, total_success_counter, \
    same_texture_counter, enabled";

/// Provides the scheduler's account queries and mutations.
///
/// Accounts are provisioned by external tooling; nothing here inserts rows.
pub struct AccountRepo;

impl AccountRepo {
    // ── Scheduler queries ────────────────────────────────────────────────

    /// Find the best eligible account for this serving node.
    ///
    /// Applies the full eligibility predicate (enabled, error budget, warmup,
    /// usage/selection cooldowns, forced-timeout window, server binding,
    /// not currently leased) and orders to spread load across the pool.
    pub async fn find_eligible(
        pool: &PgPool,
        server_name: &str,
        error_threshold: i32,
        locked: &[DbId],
        now_sec: i64,
    ) -> Result<Option<Account>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM accounts \
             WHERE enabled = true \
               AND error_counter < $1 \
               AND time_added_sec < $2 - 60 \
               AND last_used_sec < $2 - 100 \
               AND last_selected_sec < $2 - 50 \
               AND forced_timeout_at_sec < $2 - 500 \
               AND (request_server IS NULL OR request_server = 'default' OR request_server = $3) \
               AND NOT (id = ANY($4)) \
             ORDER BY last_used_sec ASC, last_selected_sec ASC, same_texture_counter ASC \
             LIMIT 1"
        );
        sqlx::query_as::<_, Account>(&query)
            .bind(error_threshold)
            .bind(now_sec)
            .bind(server_name)
            .bind(locked)
            .fetch_optional(pool)
            .await
    }

    /// Count accounts that are globally usable (enabled and within the error
    /// budget), regardless of cooldowns. Feeds the request-pacing hint.
    pub async fn count_usable(pool: &PgPool, error_threshold: i32) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM accounts WHERE enabled = true AND error_counter < $1",
        )
        .bind(error_threshold)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    // ── Mutations ────────────────────────────────────────────────────────

    /// Persist the engine-mutable fields of an account.
    pub async fn update(pool: &PgPool, account: &Account) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE accounts SET
                client_token = $2,
                access_token = $3,
                request_server = $4,
                last_used_sec = $5,
                last_selected_sec = $6,
                forced_timeout_at_sec = $7,
                error_counter = $8,
                success_counter = $9,
                total_error_counter = $10,
                total_success_counter = $11,
                same_texture_counter = $12,
                enabled = $13
             WHERE id = $1",
        )
        .bind(account.id)
        .bind(&account.client_token)
        .bind(&account.access_token)
        .bind(&account.request_server)
        .bind(account.last_used_sec)
        .bind(account.last_selected_sec)
        .bind(account.forced_timeout_at_sec)
        .bind(account.error_counter)
        .bind(account.success_counter)
        .bind(account.total_error_counter)
        .bind(account.total_success_counter)
        .bind(account.same_texture_counter)
        .bind(account.enabled)
        .execute(pool)
        .await?;
        Ok(())
    }
}
