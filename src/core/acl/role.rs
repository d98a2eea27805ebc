// src/core/acl/role.rs

use crate::core::AdminError;
use crate::core::errors::InvalidRoleDetail;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// A named permission grant assignable to a user.
///
/// Variants are declared in the order of their names, so the derived `Ord`
/// gives the canonical order roles are reported in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Manage indexes and user-defined functions.
    DataAdmin,
    Read,
    ReadWrite,
    ReadWriteUdf,
    /// Manage cluster configuration.
    SysAdmin,
    /// Manage users and their roles.
    UserAdmin,
}

impl Role {
    /// True if this role allows managing other users.
    pub fn can_manage_users(self) -> bool {
        matches!(self, Role::UserAdmin)
    }
}

/// Parses a list of role names into the canonical role set.
///
/// An empty list and any unknown name are both `InvalidRole`.
pub fn parse_roles<S: AsRef<str>>(names: &[S]) -> Result<BTreeSet<Role>, AdminError> {
    if names.is_empty() {
        return Err(AdminError::InvalidRole(InvalidRoleDetail::Empty));
    }
    names
        .iter()
        .map(|name| {
            Role::from_str(name.as_ref()).map_err(|_| {
                AdminError::InvalidRole(InvalidRoleDetail::Unknown(name.as_ref().to_string()))
            })
        })
        .collect()
}
