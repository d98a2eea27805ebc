// tests/integration/bindings_test.rs

//! Integration tests for the dynamic call surface

use super::test_helpers::{TestContext, args, empty_policy, node_config_with_seed};
use serde_json::json;
use spineldb_admin::core::commands::{Arg, ArityError, Bindings, InvokeError};
use spineldb_admin::core::errors::InvalidRoleDetail;
use spineldb_admin::core::logging::{LogHandler, LogRecord};
use spineldb_admin::core::{AdminError, LogConfig, LogLevel};
use std::sync::Arc;

fn param(msg: &str) -> InvokeError {
    InvokeError::Admin(AdminError::Param(msg.to_string()))
}

#[tokio::test]
async fn test_create_and_query_through_bindings() {
    let ctx = TestContext::new().await;
    let bindings = ctx.bindings();

    let status = bindings
        .invoke(
            "admin_create_user",
            args(vec![
                empty_policy(),
                json!("dyn"),
                json!("pw"),
                json!(["sys-admin", "read"]),
                json!(2),
            ]),
        )
        .await
        .unwrap();
    assert_eq!(status, json!(0));

    let users = bindings
        .invoke("admin_query_user", args(vec![empty_policy(), json!("dyn")]))
        .await
        .unwrap();
    assert_eq!(
        users,
        json!([{"user": "dyn", "roles": ["read", "sys-admin"], "roles_size": 2}])
    );
}

#[tokio::test]
async fn test_query_users_returns_array_of_records() {
    let ctx = TestContext::new().await;
    ctx.create_user("listed", "pw", &["read"]).await;

    let users = ctx
        .bindings()
        .invoke("admin_query_users", args(vec![json!({"timeout": 1000})]))
        .await
        .unwrap();
    let names: Vec<&str> = users
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["user"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["admin", "listed"]);
}

#[tokio::test]
async fn test_missing_argument_is_arity_error() {
    let ctx = TestContext::new().await;
    let err = ctx
        .bindings()
        .invoke("admin_drop_user", args(vec![empty_policy()]))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        InvokeError::Arity(ArityError::MissingArgument {
            function: "admin_drop_user",
            name: "username",
            position: 2,
        })
    );
    assert_eq!(err.to_string(), "Required argument 'username' (pos 2) not found");
    assert_eq!(err.code(), None);
}

#[tokio::test]
async fn test_too_many_arguments_is_arity_error() {
    let ctx = TestContext::new().await;
    let err = ctx
        .bindings()
        .invoke(
            "admin_create_user",
            args(vec![
                empty_policy(),
                json!("u"),
                json!("p"),
                json!(["read"]),
                json!(1),
                json!("extra"),
            ]),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "admin_create_user() takes at most 5 arguments (6 given)"
    );

    let err = ctx
        .bindings()
        .invoke("enable_log_handler", args(vec![json!(null), json!(null)]))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "enable_log_handler() takes at most 1 argument (2 given)"
    );
}

#[tokio::test]
async fn test_unknown_function_is_rejected() {
    let ctx = TestContext::new().await;
    let err = ctx
        .bindings()
        .invoke("admin_create_role", Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err, InvokeError::UnknownFunction("admin_create_role".to_string()));
}

#[tokio::test]
async fn test_policy_must_be_a_mapping() {
    let ctx = TestContext::new().await;
    for policy in [json!(null), json!(5), json!("fast"), json!([1000])] {
        let err = ctx
            .bindings()
            .invoke("admin_query_users", args(vec![policy]))
            .await
            .unwrap_err();
        assert_eq!(err, param("policy must be a dict"));
        assert_eq!(err.code(), Some(-2));
    }
}

#[tokio::test]
async fn test_policy_timeout_must_be_non_negative_integer() {
    let ctx = TestContext::new().await;
    for timeout in [json!(0.1), json!(-1), json!("1000"), json!(true)] {
        let err = ctx
            .bindings()
            .invoke("admin_query_users", args(vec![json!({ "timeout": timeout })]))
            .await
            .unwrap_err();
        assert_eq!(err, param("timeout is invalid"));
    }

    // Zero and unknown keys are fine.
    ctx.bindings()
        .invoke(
            "admin_query_users",
            args(vec![json!({"timeout": 0, "total_timeout": "x"})]),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_non_string_username_is_param_error() {
    let ctx = TestContext::new().await;
    let err = ctx
        .bindings()
        .invoke("admin_drop_user", args(vec![empty_policy(), json!(null)]))
        .await
        .unwrap_err();
    assert_eq!(err, param("Username should be a string"));
}

#[tokio::test]
async fn test_non_string_password_creates_nothing() {
    let ctx = TestContext::new().await;
    let bindings = ctx.bindings();
    let err = bindings
        .invoke(
            "admin_create_user",
            args(vec![
                empty_policy(),
                json!("nopw"),
                json!(null),
                json!(["read"]),
                json!(1),
            ]),
        )
        .await
        .unwrap_err();
    assert_eq!(err, param("Password should be a string"));

    let err = bindings
        .invoke("admin_query_user", args(vec![empty_policy(), json!("nopw")]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(60));
}

#[tokio::test]
async fn test_role_list_shape_is_checked() {
    let ctx = TestContext::new().await;
    let bindings = ctx.bindings();

    let err = bindings
        .invoke(
            "admin_grant_roles",
            args(vec![empty_policy(), json!("admin"), json!("read"), json!(1)]),
        )
        .await
        .unwrap_err();
    assert_eq!(err, param("Roles should be a list"));

    let err = bindings
        .invoke(
            "admin_grant_roles",
            args(vec![empty_policy(), json!("admin"), json!(["read", 7]), json!(2)]),
        )
        .await
        .unwrap_err();
    assert_eq!(err, param("Role should be a string"));

    let err = bindings
        .invoke(
            "admin_revoke_roles",
            args(vec![empty_policy(), json!("admin"), json!(["read"]), json!(-1)]),
        )
        .await
        .unwrap_err();
    assert_eq!(err, param("Roles size should be a non-negative integer"));
}

#[tokio::test]
async fn test_roles_size_mismatch_is_invalid_role() {
    let ctx = TestContext::new().await;
    let err = ctx
        .bindings()
        .invoke(
            "admin_create_user",
            args(vec![
                empty_policy(),
                json!("mismatch"),
                json!("pw"),
                json!(["read", "read-write"]),
                json!(3),
            ]),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        InvokeError::Admin(AdminError::InvalidRole(InvalidRoleDetail::CountMismatch {
            declared: 3,
            actual: 2,
        }))
    );
    assert_eq!(err.code(), Some(70));
}

#[tokio::test]
async fn test_role_violation_precedes_policy_validation() {
    let ctx = TestContext::with_config(node_config_with_seed("reader", "reader", &["read"])).await;
    let reader = ctx.connect_as("reader", "reader").await.unwrap();

    let err = ctx
        .bindings_for(&reader)
        .invoke(
            "admin_create_user",
            args(vec![json!("bad policy"), json!(null), json!(null), json!(null), json!(null)]),
        )
        .await
        .unwrap_err();
    assert_eq!(err, InvokeError::Admin(AdminError::RoleViolation));
}

#[tokio::test]
async fn test_admin_call_without_connection_is_client_error() {
    let bindings = Bindings::new(None, LogConfig::default());
    let err = bindings
        .invoke("admin_query_users", args(vec![empty_policy()]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(-1));

    // Logging calls need no connection.
    assert_eq!(
        bindings.invoke("set_log_level", args(vec![json!(2)])).await.unwrap(),
        json!(0)
    );
}

#[tokio::test]
async fn test_set_log_level_through_bindings() {
    let bindings = Bindings::new(None, LogConfig::new(LogLevel::Warn));

    let err = bindings
        .invoke("set_log_level", args(vec![json!(null)]))
        .await
        .unwrap_err();
    assert_eq!(err, param("Invalid log level"));
    assert_eq!(bindings.log_config().level(), LogLevel::Warn);

    let err = bindings
        .invoke("set_log_level", args(vec![json!(1.5)]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(-2));

    let status = bindings
        .invoke("set_log_level", args(vec![json!(9)]))
        .await
        .unwrap();
    assert_eq!(status, json!(0));
    assert_eq!(bindings.log_config().level(), LogLevel::Trace);

    bindings
        .invoke("set_log_level", args(vec![json!(-7)]))
        .await
        .unwrap();
    assert_eq!(bindings.log_config().level(), LogLevel::Off);

    bindings
        .invoke("set_log_level", args(vec![json!(u64::MAX)]))
        .await
        .unwrap();
    assert_eq!(bindings.log_config().level(), LogLevel::Trace);
}

#[tokio::test]
async fn test_enable_log_handler_through_bindings() {
    let bindings = Bindings::new(None, LogConfig::default());

    assert_eq!(
        bindings.invoke("enable_log_handler", Vec::new()).await.unwrap(),
        json!(0)
    );
    assert_eq!(
        bindings
            .invoke("enable_log_handler", args(vec![json!(null)]))
            .await
            .unwrap(),
        json!(0)
    );

    let handler: LogHandler = Arc::new(|_: &LogRecord| {});
    let status = bindings
        .invoke("enable_log_handler", vec![Arg::Callback(handler)])
        .await
        .unwrap();
    assert_eq!(status, json!(0));

    let err = bindings
        .invoke("enable_log_handler", args(vec![json!("print")]))
        .await
        .unwrap_err();
    assert_eq!(err, param("Log handler should be callable"));
}

#[tokio::test]
async fn test_change_password_through_bindings() {
    let ctx = TestContext::new().await;
    let status = ctx
        .bindings()
        .invoke(
            "admin_change_password",
            args(vec![
                json!({"timeout": 5000}),
                json!("admin"),
                json!("admin"),
                json!("changed"),
            ]),
        )
        .await
        .unwrap();
    assert_eq!(status, json!(0));
    ctx.connect_as("admin", "changed").await.unwrap();
}
