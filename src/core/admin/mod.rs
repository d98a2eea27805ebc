// src/core/admin/mod.rs

//! The admin command dispatcher.
//!
//! `AdminClient` issues user and role management commands over a `Connection`
//! and maps the node's replies to results or typed errors. Every operation takes
//! a `Policy` first; the policy's timeout, or else the connection default,
//! bounds the round trip.

mod setup;

pub use setup::SetupOutcome;

use crate::connection::Connection;
use crate::core::AdminError;
use crate::core::acl::role::parse_roles;
use crate::core::acl::{Role, User};
use crate::core::commands::AdminCommand;
use crate::core::policy::Policy;
use crate::core::protocol::{AdminFrame, FieldId};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Issues admin commands over a shared connection.
#[derive(Debug, Clone)]
pub struct AdminClient {
    conn: Arc<Connection>,
}

impl AdminClient {
    pub fn new(conn: Arc<Connection>) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    /// Creates a user with the given roles. Returns `0` on success.
    ///
    /// Roles are checked locally before anything is sent: an empty list or an
    /// unknown name fails `InvalidRole`. The role count written on the wire is
    /// always derived from `roles`.
    pub async fn create_user<S: AsRef<str>>(
        &self,
        policy: &Policy,
        user: &str,
        password: &str,
        roles: &[S],
    ) -> Result<i32, AdminError> {
        self.conn.require_user_admin().await?;
        parse_roles(roles)?;
        self.status(
            policy,
            AdminCommand::CreateUser {
                user: user.to_string(),
                password: password.to_string(),
                roles: to_owned(roles),
            },
        )
        .await
    }

    pub async fn drop_user(&self, policy: &Policy, user: &str) -> Result<i32, AdminError> {
        self.conn.require_user_admin().await?;
        self.status(
            policy,
            AdminCommand::DropUser {
                user: user.to_string(),
            },
        )
        .await
    }

    /// Queries a single user. The result holds exactly one record.
    ///
    /// Users may always query themselves; other users need `user-admin`.
    pub async fn query_user(&self, policy: &Policy, user: &str) -> Result<Vec<User>, AdminError> {
        if !self.is_self(user) {
            self.conn.require_user_admin().await?;
        }
        let frames = self
            .execute(
                policy,
                AdminCommand::QueryUsers {
                    user: Some(user.to_string()),
                },
            )
            .await?;
        let users = parse_users(&frames)?;
        if users.is_empty() {
            return Err(AdminError::InvalidUser);
        }
        Ok(users)
    }

    /// Queries every user, sorted by name.
    pub async fn query_users(&self, policy: &Policy) -> Result<Vec<User>, AdminError> {
        self.conn.require_user_admin().await?;
        let frames = self
            .execute(policy, AdminCommand::QueryUsers { user: None })
            .await?;
        let mut users = parse_users(&frames)?;
        users.sort_by(|a, b| a.user.cmp(&b.user));
        Ok(users)
    }

    pub async fn grant_roles<S: AsRef<str>>(
        &self,
        policy: &Policy,
        user: &str,
        roles: &[S],
    ) -> Result<i32, AdminError> {
        self.conn.require_user_admin().await?;
        parse_roles(roles)?;
        self.status(
            policy,
            AdminCommand::GrantRoles {
                user: user.to_string(),
                roles: to_owned(roles),
            },
        )
        .await
    }

    pub async fn revoke_roles<S: AsRef<str>>(
        &self,
        policy: &Policy,
        user: &str,
        roles: &[S],
    ) -> Result<i32, AdminError> {
        self.conn.require_user_admin().await?;
        parse_roles(roles)?;
        self.status(
            policy,
            AdminCommand::RevokeRoles {
                user: user.to_string(),
                roles: to_owned(roles),
            },
        )
        .await
    }

    /// Resets another user's password. Requires `user-admin`.
    pub async fn set_password(
        &self,
        policy: &Policy,
        user: &str,
        password: &str,
    ) -> Result<i32, AdminError> {
        self.conn.require_user_admin().await?;
        let status = self
            .status(
                policy,
                AdminCommand::SetPassword {
                    user: user.to_string(),
                    password: password.to_string(),
                },
            )
            .await?;
        self.conn.update_password(user, password);
        Ok(status)
    }

    /// Changes the logged-in user's own password.
    pub async fn change_password(
        &self,
        policy: &Policy,
        user: &str,
        old_password: &str,
        password: &str,
    ) -> Result<i32, AdminError> {
        if self.conn.principal().is_some() && !self.is_self(user) {
            return Err(AdminError::RoleViolation);
        }
        let status = self
            .status(
                policy,
                AdminCommand::ChangePassword {
                    user: user.to_string(),
                    old_password: old_password.to_string(),
                    password: password.to_string(),
                },
            )
            .await?;
        self.conn.update_password(user, password);
        Ok(status)
    }

    fn is_self(&self, user: &str) -> bool {
        self.conn.principal().is_some_and(|p| p.user == user)
    }

    async fn status(&self, policy: &Policy, command: AdminCommand) -> Result<i32, AdminError> {
        self.execute(policy, command).await.map(|_| 0)
    }

    async fn execute(
        &self,
        policy: &Policy,
        command: AdminCommand,
    ) -> Result<Vec<AdminFrame>, AdminError> {
        let timeout = policy.effective_timeout(self.conn.default_timeout());
        debug!("Dispatching {:?} (timeout: {:?})", command, timeout);
        self.conn.execute(command, timeout).await
    }
}

fn to_owned<S: AsRef<str>>(roles: &[S]) -> Vec<String> {
    roles.iter().map(|r| r.as_ref().to_string()).collect()
}

/// Converts query reply frames into user records with roles in canonical order.
fn parse_users(frames: &[AdminFrame]) -> Result<Vec<User>, AdminError> {
    frames
        .iter()
        .map(|frame| {
            let user = frame
                .field(FieldId::User)
                .ok_or_else(|| AdminError::protocol("query reply without a user field"))?
                .as_string()?;
            let mut roles = match frame.field(FieldId::Roles) {
                Some(field) => field.as_roles()?,
                None => Vec::new(),
            };
            roles.sort_by_cached_key(|name| canonical_key(name));
            Ok(User::new(user, roles))
        })
        .collect()
}

// Unknown names sort after every known role.
fn canonical_key(name: &str) -> (bool, Option<Role>, String) {
    match Role::from_str(name) {
        Ok(role) => (false, Some(role), String::new()),
        Err(_) => (true, None, name.to_string()),
    }
}
