// src/connection/session.rs

//! Defines the state associated with a single client session.

use crate::config::Credentials;
use crate::core::acl::Role;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::warn;

/// Where a `Connection` is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No live link; the next call reconnects.
    Disconnected,
    Connected,
    /// Terminal. Every call fails immediately.
    Closed,
}

/// The authenticated user behind a session, as reported at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user: String,
    pub roles: BTreeSet<Role>,
}

impl Principal {
    /// Builds a principal from the role names a node reported. Unknown names are skipped.
    pub fn from_reported(user: String, role_names: &[String]) -> Self {
        let roles = role_names
            .iter()
            .filter_map(|name| match Role::from_str(name) {
                Ok(role) => Some(role),
                Err(_) => {
                    warn!("Ignoring unknown role '{name}' reported for user '{user}'.");
                    None
                }
            })
            .collect();
        Self { user, roles }
    }

    pub fn can_manage_users(&self) -> bool {
        self.roles.iter().any(|r| r.can_manage_users())
    }
}

/// Holds the state specific to a single client session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Credentials replayed on every (re)connect.
    pub credentials: Option<Credentials>,
    /// Set after a successful login; `None` on unsecured sessions.
    pub principal: Option<Principal>,
    /// The seed the live link is attached to.
    pub peer: Option<SocketAddr>,
}

impl SessionState {
    pub(crate) fn new(credentials: Option<Credentials>) -> Self {
        Self {
            credentials,
            principal: None,
            peer: None,
        }
    }
}
