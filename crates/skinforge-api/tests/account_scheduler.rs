//! Scheduler eligibility, exclusivity, and release bookkeeping.

mod common;

use common::*;
use skinforge_api::engine::scheduler::{now_sec, FailureKind, ReleaseOutcome};
use skinforge_api::engine::EngineError;
use skinforge_core::error::GenerateError;
use skinforge_db::catalog::Catalog;

// -- Eligibility -------------------------------------------------------------

#[tokio::test]
async fn acquire_prefers_the_least_recently_used_account() {
    let env = TestEnv::new().await;
    let now = now_sec();

    let mut old = env.seed_account(1);
    old.last_used_sec = now - 5000;
    env.catalog.update_account(&old).await.unwrap();

    let mut fresh = env.seed_account(2);
    fresh.last_used_sec = now - 200;
    env.catalog.update_account(&fresh).await.unwrap();

    let lease = env.scheduler.acquire().await.unwrap();
    assert_eq!(lease.account.id, 1);
}

#[tokio::test]
async fn ineligible_accounts_are_never_selected() {
    let env = TestEnv::new().await;
    let now = now_sec();

    let mut disabled = env.seed_account(1);
    disabled.enabled = false;
    env.catalog.update_account(&disabled).await.unwrap();

    let mut over_budget = env.seed_account(2);
    over_budget.error_counter = 10;
    env.catalog.update_account(&over_budget).await.unwrap();

    let mut warming_up = env.seed_account(3);
    warming_up.time_added_sec = now - 30;
    env.catalog.update_account(&warming_up).await.unwrap();

    let mut recently_used = env.seed_account(4);
    recently_used.last_used_sec = now - 50;
    env.catalog.update_account(&recently_used).await.unwrap();

    let mut recently_selected = env.seed_account(5);
    recently_selected.last_selected_sec = now - 10;
    env.catalog.update_account(&recently_selected).await.unwrap();

    let mut parked = env.seed_account(6);
    parked.forced_timeout_at_sec = now - 100;
    env.catalog.update_account(&parked).await.unwrap();

    let mut foreign = env.seed_account(7);
    foreign.request_server = Some("another-node".to_string());
    env.catalog.update_account(&foreign).await.unwrap();

    let err = env.scheduler.acquire().await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Generate(GenerateError::NoAccountAvailable)
    ));
}

#[tokio::test]
async fn server_bound_accounts_match_their_own_node() {
    let env = TestEnv::new().await;

    let mut bound = env.seed_account(1);
    bound.request_server = Some("test-node".to_string());
    env.catalog.update_account(&bound).await.unwrap();

    let lease = env.scheduler.acquire().await.unwrap();
    assert_eq!(lease.account.id, 1);
}

// -- Exclusivity -------------------------------------------------------------

#[tokio::test]
async fn a_leased_account_is_not_handed_out_twice() {
    let env = TestEnv::new().await;
    env.seed_account(1);

    let lease = env.scheduler.acquire().await.unwrap();
    assert!(env.scheduler.is_locked(1));

    let err = env.scheduler.acquire().await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Generate(GenerateError::NoAccountAvailable)
    ));

    drop(lease);
}

#[tokio::test]
async fn acquire_stamps_the_selection_time() {
    let env = TestEnv::new().await;
    env.seed_account(1);
    let before = now_sec();

    let lease = env.scheduler.acquire().await.unwrap();
    assert!(lease.account.last_selected_sec >= before);

    let stored = env.catalog.account(1).unwrap();
    assert!(stored.last_selected_sec >= before);
}

/// Dropping a lease (cancellation) releases the lock and charges the
/// account like a failure.
#[tokio::test]
async fn dropped_lease_unlocks_and_records_a_failure() {
    let env = TestEnv::new().await;
    let mut seeded = env.seed_account(1);
    seeded.success_counter = 5;
    env.catalog.update_account(&seeded).await.unwrap();

    let lease = env.scheduler.acquire().await.unwrap();
    assert!(env.scheduler.is_locked(1));
    drop(lease);
    assert!(!env.scheduler.is_locked(1));

    // The failure write-back runs on a spawned task; give it a moment.
    for _ in 0..100 {
        if env.catalog.account(1).unwrap().error_counter > 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let stored = env.catalog.account(1).unwrap();
    assert_eq!(stored.error_counter, 1);
    assert_eq!(stored.total_error_counter, 1);
    assert_eq!(stored.success_counter, 0);
    // A cancellation is not an auth failure; the account is not parked.
    assert_eq!(stored.forced_timeout_at_sec, 0);
}

/// An explicit release never double-charges through the drop guard.
#[tokio::test]
async fn released_lease_is_not_charged_again_on_drop() {
    let env = TestEnv::new().await;
    env.seed_account(1);

    let lease = env.scheduler.acquire().await.unwrap();
    env.scheduler
        .release(lease, ReleaseOutcome::Success)
        .await
        .unwrap();

    // Let any stray drop-guard task run before checking.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let stored = env.catalog.account(1).unwrap();
    assert_eq!(stored.error_counter, 0);
    assert_eq!(stored.total_error_counter, 0);
    assert_eq!(stored.success_counter, 1);
}

// -- Release bookkeeping -----------------------------------------------------

#[tokio::test]
async fn release_success_resets_the_error_budget() {
    let env = TestEnv::new().await;
    let mut seeded = env.seed_account(1);
    seeded.error_counter = 4;
    env.catalog.update_account(&seeded).await.unwrap();
    let before = now_sec();

    let lease = env.scheduler.acquire().await.unwrap();
    env.scheduler
        .release(lease, ReleaseOutcome::Success)
        .await
        .unwrap();

    let stored = env.catalog.account(1).unwrap();
    assert!(stored.last_used_sec >= before);
    assert_eq!(stored.success_counter, 1);
    assert_eq!(stored.total_success_counter, 1);
    assert_eq!(stored.error_counter, 0);
    assert!(!env.scheduler.is_locked(1));
}

#[tokio::test]
async fn release_failure_resets_the_success_streak() {
    let env = TestEnv::new().await;
    let mut seeded = env.seed_account(1);
    seeded.success_counter = 9;
    env.catalog.update_account(&seeded).await.unwrap();

    let lease = env.scheduler.acquire().await.unwrap();
    env.scheduler
        .release(lease, ReleaseOutcome::Failure(FailureKind::Upstream))
        .await
        .unwrap();

    let stored = env.catalog.account(1).unwrap();
    assert_eq!(stored.success_counter, 0);
    assert_eq!(stored.error_counter, 1);
    assert_eq!(stored.total_error_counter, 1);
    // A plain upstream failure does not park the account.
    assert_eq!(stored.forced_timeout_at_sec, 0);
}

#[tokio::test]
async fn auth_failure_parks_the_account() {
    let env = TestEnv::new().await;
    let mut seeded = env.seed_account(1);
    seeded.request_server = Some("test-node".to_string());
    env.catalog.update_account(&seeded).await.unwrap();
    let before = now_sec();

    let lease = env.scheduler.acquire().await.unwrap();
    env.scheduler
        .release(lease, ReleaseOutcome::Failure(FailureKind::Auth))
        .await
        .unwrap();

    let stored = env.catalog.account(1).unwrap();
    assert!(stored.forced_timeout_at_sec >= before);
    assert_eq!(stored.request_server, None);
    assert_eq!(stored.error_counter, 1);
}

// -- Pacing hint -------------------------------------------------------------

#[tokio::test]
async fn pacing_hint_shrinks_with_the_usable_pool() {
    let env = TestEnv::new().await;
    env.seed_account(1);
    env.seed_account(2);

    // 200s base delay over two usable accounts.
    let now = now_sec();
    let hint = env.scheduler.next_request_epoch().await;
    assert!(hint >= now + 99 && hint <= now + 101, "hint was {hint}");
}

#[tokio::test]
async fn pacing_hint_never_divides_by_zero() {
    let env = TestEnv::new().await;
    let now = now_sec();
    let hint = env.scheduler.next_request_epoch().await;
    assert!(hint >= now + 199 && hint <= now + 201, "hint was {hint}");
}
