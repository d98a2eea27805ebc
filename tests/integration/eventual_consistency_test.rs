// tests/integration/eventual_consistency_test.rs

//! Integration tests against a node that delays the visibility of user changes

use super::test_helpers::{TestContext, test_node_config};
use spineldb_admin::core::{AdminError, Policy};
use std::time::Duration;

const DELAY: Duration = Duration::from_millis(200);
const SETTLE: Duration = Duration::from_secs(3);

async fn delayed_context() -> TestContext {
    let mut config = test_node_config();
    config.propagation_delay = DELAY;
    TestContext::with_config(config).await
}

#[tokio::test]
async fn test_new_user_is_not_visible_immediately() {
    let ctx = delayed_context().await;
    let policy = Policy::default();

    ctx.admin
        .create_user(&policy, "late", "pw", &["read"])
        .await
        .unwrap();
    let err = ctx.admin.query_user(&policy, "late").await.unwrap_err();
    assert_eq!(err, AdminError::InvalidUser);

    let user = ctx
        .admin
        .wait_for_user(&policy, "late", SETTLE, |_| true)
        .await
        .unwrap();
    assert_eq!(user.roles, vec!["read"]);
}

#[tokio::test]
async fn test_new_user_can_log_in_before_it_is_visible() {
    let ctx = delayed_context().await;
    ctx.admin
        .create_user(&Policy::default(), "early", "pw", &["read"])
        .await
        .unwrap();
    ctx.connect_as("early", "pw").await.unwrap();
}

#[tokio::test]
async fn test_wait_for_user_observes_role_change() {
    let ctx = delayed_context().await;
    let policy = Policy::default();
    ctx.create_user("evolving", "pw", &["read"]).await;
    ctx.admin
        .wait_for_user(&policy, "evolving", SETTLE, |_| true)
        .await
        .unwrap();

    ctx.admin
        .grant_roles(&policy, "evolving", &["data-admin"])
        .await
        .unwrap();
    let user = ctx
        .admin
        .wait_for_user(&policy, "evolving", SETTLE, |u| u.has_role("data-admin"))
        .await
        .unwrap();
    assert_eq!(user.roles, vec!["data-admin", "read"]);
}

#[tokio::test]
async fn test_wait_for_missing_user_returns_last_error() {
    let ctx = delayed_context().await;
    let err = ctx
        .admin
        .wait_for_user(&Policy::default(), "never", Duration::from_millis(100), |_| true)
        .await
        .unwrap_err();
    assert_eq!(err, AdminError::InvalidUser);
}

#[tokio::test]
async fn test_wait_for_unmet_predicate_times_out() {
    let ctx = delayed_context().await;
    let err = ctx
        .admin
        .wait_for_user(&Policy::default(), "admin", Duration::from_millis(100), |u| {
            u.has_role("sys-admin")
        })
        .await
        .unwrap_err();
    assert_eq!(err, AdminError::Timeout);
}

#[tokio::test]
async fn test_dropped_user_disappears_after_delay() {
    let ctx = delayed_context().await;
    let policy = Policy::default();
    ctx.create_user("fading", "pw", &["read"]).await;
    ctx.admin
        .wait_for_user(&policy, "fading", SETTLE, |_| true)
        .await
        .unwrap();

    ctx.admin.drop_user(&policy, "fading").await.unwrap();
    // Still visible, but already gone for writes and logins.
    assert!(ctx.admin.query_user(&policy, "fading").await.is_ok());
    assert_eq!(ctx.connect_as("fading", "pw").await.unwrap_err().code(), 65);

    tokio::time::sleep(DELAY * 2).await;
    let err = ctx.admin.query_user(&policy, "fading").await.unwrap_err();
    assert_eq!(err.code(), 60);
}
