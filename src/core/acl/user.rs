// src/core/acl/user.rs

use serde::{Deserialize, Serialize};

/// A user record as reported by a query.
///
/// Serializes to `{"roles": [...], "roles_size": n, "user": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Role names in canonical order.
    pub roles: Vec<String>,
    /// Always equal to `roles.len()`.
    pub roles_size: usize,
    /// The user name.
    pub user: String,
}

impl User {
    pub fn new(user: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            roles_size: roles.len(),
            roles,
            user: user.into(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
