// tests/integration/test_helpers.rs

//! Test helpers and utilities for integration tests

use serde_json::{Value, json};
use spineldb_admin::config::{ClientConfig, Credentials, NodeConfig, SeedUser};
use spineldb_admin::connection::Connection;
use spineldb_admin::core::commands::{Arg, Bindings};
use spineldb_admin::core::{AdminClient, AdminError, LogConfig, LogLevel, Policy};
use spineldb_admin::server::{self, NodeHandle};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, reload};

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin";

/// TestContext provides a running admin node and an admin session against it
pub struct TestContext {
    pub node: NodeHandle,
    pub admin: AdminClient,
    pub log: LogConfig,
}

impl TestContext {
    /// Creates a new test context with the default node configuration
    pub async fn new() -> Self {
        Self::with_config(test_node_config()).await
    }

    /// Creates a new test context with a custom node configuration
    pub async fn with_config(config: NodeConfig) -> Self {
        init_tracing();

        let node = server::spawn(config)
            .await
            .expect("Failed to spawn admin node");
        let admin = connect_as(&node, ADMIN_USER, ADMIN_PASSWORD)
            .await
            .expect("Failed to log in as admin");

        Self {
            node,
            admin,
            log: LogConfig::new(LogLevel::Warn),
        }
    }

    /// Opens another session against the same node
    pub async fn connect_as(&self, user: &str, password: &str) -> Result<AdminClient, AdminError> {
        connect_as(&self.node, user, password).await
    }

    /// Dynamic bindings over the admin session
    pub fn bindings(&self) -> Bindings {
        Bindings::new(Some(self.admin.clone()), self.log.clone())
    }

    /// Dynamic bindings over an arbitrary session
    pub fn bindings_for(&self, client: &AdminClient) -> Bindings {
        Bindings::new(Some(client.clone()), self.log.clone())
    }

    /// Creates a user through the admin session, replacing any previous one
    pub async fn create_user(&self, user: &str, password: &str, roles: &[&str]) {
        self.admin
            .ensure_user(&Policy::default(), user, password, roles)
            .await
            .expect("Failed to set up user");
    }

    pub fn policy(&self) -> Policy {
        Policy::default()
    }
}

/// A node bound to an ephemeral local port with the default `admin` seed user
pub fn test_node_config() -> NodeConfig {
    NodeConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        log_level: "warn".to_string(),
        ..NodeConfig::default()
    }
}

/// A node configuration with an extra seed user
pub fn node_config_with_seed(name: &str, password: &str, roles: &[&str]) -> NodeConfig {
    let mut config = test_node_config();
    config.security.users.push(SeedUser {
        name: name.to_string(),
        password: password.to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
    });
    config
}

/// A client configuration pointing at the given node
pub fn client_config(node: &NodeHandle) -> ClientConfig {
    let mut config = ClientConfig::new([node.host()]);
    config.default_timeout = Duration::from_secs(10);
    config
}

pub async fn connect_as(
    node: &NodeHandle,
    user: &str,
    password: &str,
) -> Result<AdminClient, AdminError> {
    let conn = Connection::connect(client_config(node), Some(Credentials::new(user, password))).await?;
    Ok(AdminClient::new(Arc::new(conn)))
}

/// Converts a list of JSON values into binding arguments
pub fn args(values: Vec<Value>) -> Vec<Arg> {
    values.into_iter().map(Arg::Json).collect()
}

/// An empty policy mapping
pub fn empty_policy() -> Value {
    json!({})
}

/// Set up minimal tracing for tests (ignore error if already initialized)
pub fn init_tracing() {
    let (filter, _reload_handle) = reload::Layer::new(EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
