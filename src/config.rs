// src/config.rs

//! Manages client and node configuration: loading, defaults and validation.

use crate::core::acl::role::parse_roles;
use crate::core::logging::LogLevel;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use tracing::warn;

/// The port assumed for a seed host given without one.
pub const DEFAULT_PORT: u16 = 3000;

/// Login credentials for a secured cluster.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

// Never print the password.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Client-side configuration used to open a `Connection`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClientConfig {
    /// Seed hosts, tried in order. Each entry is `host` or `host:port`.
    pub hosts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Applied when a call's policy carries no timeout. `0` waits indefinitely.
    #[serde(default, with = "humantime_serde")]
    pub default_timeout: Duration,
    /// Bound on establishing the TCP connection to one seed.
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(2)
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            hosts: vec![format!("127.0.0.1:{DEFAULT_PORT}")],
            user: None,
            password: None,
            default_timeout: Duration::ZERO,
            connect_timeout: default_connect_timeout(),
            log_level: default_log_level(),
        }
    }
}

impl ClientConfig {
    /// A configuration with the given seed hosts and default settings otherwise.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Creates a new `ClientConfig` by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        let config: ClientConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML from '{path}'"))?;
        config.validate()?;
        Ok(config)
    }

    /// Credentials from the file, if both user and password are present.
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => Some(Credentials::new(user, password)),
            _ => None,
        }
    }

    /// The default timeout as an option; zero means none.
    pub fn default_timeout(&self) -> Option<Duration> {
        (!self.default_timeout.is_zero()).then_some(self.default_timeout)
    }

    /// Validates the configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.hosts.is_empty() {
            return Err(anyhow!("hosts cannot be empty"));
        }
        for host in &self.hosts {
            parse_host(host)?;
        }
        if self.user.is_some() != self.password.is_some() {
            return Err(anyhow!("user and password must be set together"));
        }
        if self.connect_timeout.is_zero() {
            return Err(anyhow!("connect_timeout cannot be 0"));
        }
        if LogLevel::from_name(&self.log_level).is_none() {
            warn!(
                "log_level '{}' is not a plain level name; it will be used as a filter directive.",
                self.log_level
            );
        }
        Ok(())
    }
}

/// Splits a seed host entry into host and port.
pub fn parse_host(entry: &str) -> Result<(String, u16)> {
    let entry = entry.trim();
    if entry.is_empty() {
        return Err(anyhow!("host entry cannot be empty"));
    }
    // Bracketed IPv6 literal, optionally with a port.
    if let Some(rest) = entry.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| anyhow!("unterminated IPv6 literal in '{entry}'"))?;
        let port: u16 = match tail.strip_prefix(':') {
            Some(p) => p
                .parse()
                .with_context(|| format!("invalid port in '{entry}'"))?,
            None if tail.is_empty() => DEFAULT_PORT,
            None => return Err(anyhow!("unexpected characters after ']' in '{entry}'")),
        };
        if port == 0 {
            return Err(anyhow!("port cannot be 0 in '{entry}'"));
        }
        return Ok((host.to_string(), port));
    }
    match entry.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => {
            let port: u16 = port
                .parse()
                .with_context(|| format!("invalid port in '{entry}'"))?;
            if port == 0 {
                return Err(anyhow!("port cannot be 0 in '{entry}'"));
            }
            Ok((host.to_string(), port))
        }
        _ => Ok((entry.to_string(), DEFAULT_PORT)),
    }
}

/// A user created when an admin node starts.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SeedUser {
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Security settings of an admin node.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SecurityConfig {
    /// When false, every admin command is answered with `SecurityNotEnabled`.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_seed_users")]
    pub users: Vec<SeedUser>,
    #[serde(default = "default_max_user_len")]
    pub max_user_len: usize,
    #[serde(default = "default_max_password_len")]
    pub max_password_len: usize,
    /// Delay before answering a failed login.
    #[serde(default = "default_login_failure_delay", with = "humantime_serde")]
    pub login_failure_delay: Duration,
}

fn default_true() -> bool {
    true
}
fn default_seed_users() -> Vec<SeedUser> {
    vec![SeedUser {
        name: "admin".to_string(),
        password: "admin".to_string(),
        roles: vec!["user-admin".to_string()],
    }]
}
fn default_max_user_len() -> usize {
    63
}
fn default_max_password_len() -> usize {
    64 * 1024
}
fn default_login_failure_delay() -> Duration {
    Duration::from_millis(100)
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            users: default_seed_users(),
            max_user_len: default_max_user_len(),
            max_password_len: default_max_password_len(),
            login_failure_delay: default_login_failure_delay(),
        }
    }
}

/// Configuration of an admin node.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NodeConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
    /// How long a committed user change stays invisible to queries.
    #[serde(default, with = "humantime_serde")]
    pub propagation_delay: Duration,
    #[serde(default)]
    pub security: SecurityConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_max_clients() -> usize {
    1024
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            max_clients: default_max_clients(),
            propagation_delay: Duration::ZERO,
            security: SecurityConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Creates a new `NodeConfig` by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        let config: NodeConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML from '{path}'"))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration to ensure logical consistency.
    /// Port `0` is allowed and asks the OS for an ephemeral port.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.max_clients == 0 {
            return Err(anyhow!("max_clients cannot be 0"));
        }
        let security = &self.security;
        if security.max_user_len == 0 {
            return Err(anyhow!("security.max_user_len cannot be 0"));
        }
        if security.enabled && security.users.is_empty() {
            return Err(anyhow!(
                "security.users cannot be empty when security is enabled"
            ));
        }
        for (i, user) in security.users.iter().enumerate() {
            if user.name.is_empty() || user.name.len() > security.max_user_len {
                return Err(anyhow!(
                    "security.users #{}: name must be 1..={} bytes",
                    i + 1,
                    security.max_user_len
                ));
            }
            if user.password.len() > security.max_password_len {
                return Err(anyhow!(
                    "security.users #{}: password exceeds {} bytes",
                    i + 1,
                    security.max_password_len
                ));
            }
            if !user.roles.is_empty() {
                parse_roles(&user.roles).map_err(|_| {
                    anyhow!("security.users #{}: unknown role in {:?}", i + 1, user.roles)
                })?;
            }
        }
        if security.enabled
            && !security.users.iter().any(|u| {
                u.roles
                    .iter()
                    .any(|r| r.as_str() == crate::core::acl::Role::UserAdmin.as_ref())
            })
        {
            warn!("No seed user holds the user-admin role; users cannot be managed on this node.");
        }
        Ok(())
    }
}
