//! Account pool entity model.

use serde::Serialize;
use skinforge_core::types::DbId;
use sqlx::FromRow;

/// An upstream-credential row from the `accounts` table.
///
/// Accounts are provisioned externally; the engine only mutates tokens,
/// counters, timestamps, and the forced-timeout window. All `_sec` fields
/// are epoch seconds.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: DbId,
    pub username: String,
    #[serde(skip_serializing)]
    pub encrypted_password: String,
    #[serde(skip_serializing)]
    pub encrypted_security_answer: Option<String>,
    /// Stable per-account token, generated once on first login.
    pub client_token: Option<String>,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    /// Origin IP forwarded on upstream calls for this account.
    pub request_ip: Option<String>,
    /// Optional binding to one serving node; `NULL` or `default` means any.
    pub request_server: Option<String>,
    pub last_used_sec: i64,
    pub last_selected_sec: i64,
    pub forced_timeout_at_sec: i64,
    pub time_added_sec: i64,
    pub error_counter: i32,
    pub success_counter: i32,
    pub total_error_counter: i64,
    pub total_success_counter: i64,
    pub same_texture_counter: i32,
    pub enabled: bool,
}
