// tests/integration/admin_user_test.rs

//! Integration tests for user creation, querying and removal

use super::test_helpers::TestContext;
use spineldb_admin::core::acl::User;
use spineldb_admin::core::errors::InvalidRoleDetail;
use spineldb_admin::core::{AdminError, Policy, SetupOutcome};
use std::time::Duration;

#[tokio::test]
async fn test_create_then_query_returns_created_roles() {
    let ctx = TestContext::new().await;
    let policy = Policy::default();

    let status = ctx
        .admin
        .create_user(&policy, "user1", "user1", &["read", "read-write", "sys-admin"])
        .await
        .unwrap();
    assert_eq!(status, 0);

    let users = ctx.admin.query_user(&policy, "user1").await.unwrap();
    assert_eq!(
        users,
        vec![User::new(
            "user1",
            vec![
                "read".to_string(),
                "read-write".to_string(),
                "sys-admin".to_string()
            ]
        )]
    );
    assert_eq!(users[0].roles_size, 3);
}

#[tokio::test]
async fn test_query_reports_roles_in_canonical_order() {
    let ctx = TestContext::new().await;
    let policy = Policy::default();

    ctx.admin
        .create_user(&policy, "ordered", "pw", &["user-admin", "read", "data-admin"])
        .await
        .unwrap();

    let users = ctx.admin.query_user(&policy, "ordered").await.unwrap();
    assert_eq!(users[0].roles, vec!["data-admin", "read", "user-admin"]);
}

#[tokio::test]
async fn test_query_never_created_user_is_invalid_user() {
    let ctx = TestContext::new().await;
    let err = ctx
        .admin
        .query_user(&Policy::default(), "ghost")
        .await
        .unwrap_err();
    assert_eq!(err, AdminError::InvalidUser);
    assert_eq!(err.code(), 60);
    assert_eq!(err.msg(), "AEROSPIKE_INVALID_USER");
}

#[tokio::test]
async fn test_drop_user_twice_fails_second_time() {
    let ctx = TestContext::new().await;
    let policy = Policy::default();
    ctx.create_user("dropme", "pw", &["read"]).await;

    assert_eq!(ctx.admin.drop_user(&policy, "dropme").await.unwrap(), 0);
    let err = ctx.admin.drop_user(&policy, "dropme").await.unwrap_err();
    assert_eq!(err.code(), 60);

    let err = ctx.admin.query_user(&policy, "dropme").await.unwrap_err();
    assert_eq!(err, AdminError::InvalidUser);
}

#[tokio::test]
async fn test_create_with_empty_name_is_invalid_user() {
    let ctx = TestContext::new().await;
    let err = ctx
        .admin
        .create_user(&Policy::default(), "", "pw", &["read"])
        .await
        .unwrap_err();
    assert_eq!(err.code(), 60);
}

#[tokio::test]
async fn test_create_with_too_long_name_is_invalid_user() {
    let ctx = TestContext::new().await;
    let long_name = "u".repeat(64);
    let err = ctx
        .admin
        .create_user(&Policy::default(), &long_name, "pw", &["read"])
        .await
        .unwrap_err();
    assert_eq!(err, AdminError::InvalidUser);
}

#[tokio::test]
async fn test_create_with_empty_password_is_accepted() {
    let ctx = TestContext::new().await;
    let policy = Policy::default();
    ctx.admin
        .create_user(&policy, "nopass", "", &["read"])
        .await
        .unwrap();

    let session = ctx.connect_as("nopass", "").await.unwrap();
    let users = session.query_user(&policy, "nopass").await.unwrap();
    assert_eq!(users[0].user, "nopass");
}

#[tokio::test]
async fn test_create_with_long_password_is_accepted() {
    let ctx = TestContext::new().await;
    let policy = Policy::default();
    let password = "user#".repeat(1000);
    let status = ctx
        .admin
        .create_user(&policy, "user10", &password, &["read-write"])
        .await
        .unwrap();
    assert_eq!(status, 0);

    let users = ctx.admin.query_user(&policy, "user10").await.unwrap();
    assert_eq!(users[0].roles, vec!["read-write"]);
    assert_eq!(users[0].roles_size, 1);
    ctx.connect_as("user10", &password).await.unwrap();
}

#[tokio::test]
async fn test_create_with_password_over_node_limit_is_invalid_password() {
    let ctx = TestContext::new().await;
    let err = ctx
        .admin
        .create_user(&Policy::default(), "bigpass", &"p".repeat(64 * 1024 + 1), &["read"])
        .await
        .unwrap_err();
    assert_eq!(err, AdminError::InvalidPassword);
    assert_eq!(err.code(), 62);
}

#[tokio::test]
async fn test_create_with_empty_roles_is_invalid_role() {
    let ctx = TestContext::new().await;
    let roles: [&str; 0] = [];
    let err = ctx
        .admin
        .create_user(&Policy::default(), "noroles", "pw", &roles)
        .await
        .unwrap_err();
    assert_eq!(err, AdminError::InvalidRole(InvalidRoleDetail::Empty));
    assert_eq!(err.code(), 70);

    // Nothing was created.
    let err = ctx
        .admin
        .query_user(&Policy::default(), "noroles")
        .await
        .unwrap_err();
    assert_eq!(err.code(), 60);
}

#[tokio::test]
async fn test_create_with_unknown_role_is_invalid_role() {
    let ctx = TestContext::new().await;
    let err = ctx
        .admin
        .create_user(&Policy::default(), "badrole", "pw", &["read", "superuser"])
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AdminError::InvalidRole(InvalidRoleDetail::Unknown("superuser".to_string()))
    );
    assert_eq!(err.msg(), "AEROSPIKE_INVALID_ROLE");
}

#[tokio::test]
async fn test_create_existing_user_is_user_already_exists() {
    let ctx = TestContext::new().await;
    let policy = Policy::default();
    ctx.create_user("twice", "pw", &["read"]).await;

    let err = ctx
        .admin
        .create_user(&policy, "twice", "pw", &["read"])
        .await
        .unwrap_err();
    assert_eq!(err, AdminError::UserAlreadyExists);
    assert_eq!(err.code(), 61);
}

#[tokio::test]
async fn test_ensure_user_reports_created_then_replaced() {
    let ctx = TestContext::new().await;
    let policy = Policy::default();

    let first = ctx
        .admin
        .ensure_user(&policy, "setup", "pw", &["read"])
        .await
        .unwrap();
    assert_eq!(first, SetupOutcome::Created);

    let second = ctx
        .admin
        .ensure_user(&policy, "setup", "pw2", &["read-write"])
        .await
        .unwrap();
    assert_eq!(second, SetupOutcome::Replaced);

    let users = ctx.admin.query_user(&policy, "setup").await.unwrap();
    assert_eq!(users[0].roles, vec!["read-write"]);
}

#[tokio::test]
async fn test_query_users_lists_everyone_sorted() {
    let ctx = TestContext::new().await;
    ctx.create_user("zed", "pw", &["read"]).await;
    ctx.create_user("bob", "pw", &["read-write"]).await;

    let users = ctx.admin.query_users(&Policy::default()).await.unwrap();
    let names: Vec<&str> = users.iter().map(|u| u.user.as_str()).collect();
    assert_eq!(names, vec!["admin", "bob", "zed"]);
}

#[tokio::test]
async fn test_policy_timeout_bounds_a_successful_call() {
    let ctx = TestContext::new().await;
    let policy = Policy::with_timeout(Duration::from_secs(5));
    ctx.admin
        .create_user(&policy, "timed", "pw", &["read"])
        .await
        .unwrap();
    assert_eq!(ctx.admin.query_user(&policy, "timed").await.unwrap().len(), 1);
}
