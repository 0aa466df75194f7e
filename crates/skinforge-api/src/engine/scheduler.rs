//! Exclusive selection over the shared upstream account pool.
//!
//! Eligibility is a catalog query (so cooldowns persist across serving
//! nodes); exclusivity within this process is a mutex-guarded set of leased
//! account IDs. Cross-node exclusivity relies on the persisted
//! `last_used_sec` / `last_selected_sec` cooldown windows.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use skinforge_core::error::GenerateError;
use skinforge_core::types::DbId;
use skinforge_db::catalog::Catalog;
use skinforge_db::models::account::Account;

use super::EngineError;

/// How often acquire re-queries after losing a lock race.
const MAX_ACQUIRE_ATTEMPTS: u32 = 3;

/// Scheduler tuning, straight from service configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// This serving node's name, matched against `accounts.request_server`.
    pub server_name: String,
    /// Accounts at or above this error count are out of rotation.
    pub error_threshold: i32,
    /// Base request-pacing delay; divided by the usable-account count.
    pub min_account_delay_secs: i64,
}

/// Why a leased account is being returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Success,
    Failure(FailureKind),
}

/// Failure classification for release bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Login/refresh/validate failed; parks the account.
    Auth,
    /// Any other failure while holding the lease.
    Upstream,
}

/// An exclusively-held account.
///
/// Dropping the lease always removes the account from the locked set, so a
/// cancelled request can never leak a lock. A lease that is dropped without
/// going through [`AccountScheduler::release`] (client disconnect, task
/// abort, shutdown) is treated as a failure: the error counters are bumped
/// and written back on a spawned task, since `Drop` cannot await.
pub struct AccountLease {
    pub account: Account,
    locked: Arc<Mutex<HashSet<DbId>>>,
    catalog: Arc<dyn Catalog>,
    released: bool,
}

impl std::fmt::Debug for AccountLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountLease")
            .field("account", &self.account)
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for AccountLease {
    fn drop(&mut self) {
        self.locked.lock().unwrap().remove(&self.account.id);
        if self.released {
            return;
        }

        // Cancelled mid-lease: charge the account like any other failure.
        let mut account = self.account.clone();
        account.success_counter = 0;
        account.error_counter += 1;
        account.total_error_counter += 1;

        let catalog = Arc::clone(&self.catalog);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(
                    account_id = account.id,
                    error_counter = account.error_counter,
                    "Lease dropped without release, recording failure",
                );
                handle.spawn(async move {
                    if let Err(e) = catalog.update_account(&account).await {
                        tracing::error!(
                            account_id = account.id,
                            error = %e,
                            "Failed to record cancelled lease",
                        );
                    }
                });
            }
            Err(_) => {
                tracing::error!(
                    account_id = account.id,
                    "Lease dropped outside a runtime, failure not recorded",
                );
            }
        }
    }
}

/// Selects, leases, and releases pool accounts.
pub struct AccountScheduler {
    catalog: Arc<dyn Catalog>,
    locked: Arc<Mutex<HashSet<DbId>>>,
    config: SchedulerConfig,
}

impl AccountScheduler {
    pub fn new(catalog: Arc<dyn Catalog>, config: SchedulerConfig) -> Self {
        Self {
            catalog,
            locked: Arc::new(Mutex::new(HashSet::new())),
            config,
        }
    }

    /// Lease the best eligible account.
    ///
    /// Returns [`GenerateError::NoAccountAvailable`] when the pool has no
    /// eligible member or every candidate was locked by a concurrent request.
    pub async fn acquire(&self) -> Result<AccountLease, EngineError> {
        let now = now_sec();

        for _ in 0..MAX_ACQUIRE_ATTEMPTS {
            let snapshot: Vec<DbId> = self.locked.lock().unwrap().iter().copied().collect();
            let Some(mut account) = self
                .catalog
                .find_eligible_account(
                    &self.config.server_name,
                    self.config.error_threshold,
                    &snapshot,
                    now,
                )
                .await?
            else {
                break;
            };

            // Another request may have leased this account between the query
            // and here; if so, re-query with the fresh locked set.
            if !self.locked.lock().unwrap().insert(account.id) {
                continue;
            }

            account.last_selected_sec = now;
            if let Err(e) = self.catalog.update_account(&account).await {
                self.locked.lock().unwrap().remove(&account.id);
                return Err(e.into());
            }

            tracing::debug!(account_id = account.id, "Leased account");
            return Ok(AccountLease {
                account,
                locked: Arc::clone(&self.locked),
                catalog: Arc::clone(&self.catalog),
                released: false,
            });
        }

        Err(GenerateError::NoAccountAvailable.into())
    }

    /// Record the outcome of a lease and return the account to the pool.
    ///
    /// On success the error budget resets; on failure the success streak
    /// resets, and an auth failure additionally parks the account behind the
    /// forced-timeout window and clears its server binding.
    pub async fn release(
        &self,
        mut lease: AccountLease,
        outcome: ReleaseOutcome,
    ) -> Result<Account, EngineError> {
        // The explicit release owns the bookkeeping from here on; the drop
        // guard must not charge the account a second time.
        lease.released = true;

        let now = now_sec();
        let mut account = lease.account.clone();

        match outcome {
            ReleaseOutcome::Success => {
                account.last_used_sec = now;
                account.success_counter += 1;
                account.total_success_counter += 1;
                account.error_counter = 0;
            }
            ReleaseOutcome::Failure(kind) => {
                account.success_counter = 0;
                account.error_counter += 1;
                account.total_error_counter += 1;
                if kind == FailureKind::Auth {
                    account.forced_timeout_at_sec = now;
                    account.request_server = None;
                }
                tracing::warn!(
                    account_id = account.id,
                    error_counter = account.error_counter,
                    kind = ?kind,
                    "Account released with failure",
                );
            }
        }

        self.catalog.update_account(&account).await?;
        drop(lease);
        Ok(account)
    }

    /// Whether an account is currently leased by this process.
    pub fn is_locked(&self, id: DbId) -> bool {
        self.locked.lock().unwrap().contains(&id)
    }

    /// Epoch second before which callers should not send another request.
    ///
    /// The pacing window shrinks as the usable pool grows. Best-effort: a
    /// catalog error degrades to the full base delay.
    pub async fn next_request_epoch(&self) -> i64 {
        let usable = self
            .catalog
            .count_usable_accounts(self.config.error_threshold)
            .await
            .unwrap_or(1);
        now_sec() + self.config.min_account_delay_secs / usable.max(1)
    }
}

/// Current time as epoch seconds.
pub fn now_sec() -> i64 {
    chrono::Utc::now().timestamp()
}
