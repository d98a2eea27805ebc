// src/core/commands/admin_command.rs

//! The admin command set and its conversion to and from wire frames.
//! The client builds frames from commands; the node parses frames back into commands.

use crate::core::AdminError;
use crate::core::errors::{InvalidRoleDetail, ResultCode};
use crate::core::protocol::{AdminField, AdminFrame, FieldId};
use std::fmt;

/// Command identifiers carried in the admin header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandId {
    CreateUser = 1,
    DropUser = 2,
    SetPassword = 3,
    ChangePassword = 4,
    GrantRoles = 5,
    RevokeRoles = 6,
    QueryUsers = 9,
    Login = 20,
}

impl TryFrom<u8> for CommandId {
    type Error = AdminError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => CommandId::CreateUser,
            2 => CommandId::DropUser,
            3 => CommandId::SetPassword,
            4 => CommandId::ChangePassword,
            5 => CommandId::GrantRoles,
            6 => CommandId::RevokeRoles,
            9 => CommandId::QueryUsers,
            20 => CommandId::Login,
            _ => return Err(AdminError::Server(ResultCode::InvalidCommand as u8)),
        })
    }
}

/// A parsed admin command.
#[derive(Clone, PartialEq)]
pub enum AdminCommand {
    Login {
        user: String,
        password: String,
    },
    CreateUser {
        user: String,
        password: String,
        roles: Vec<String>,
    },
    DropUser {
        user: String,
    },
    SetPassword {
        user: String,
        password: String,
    },
    ChangePassword {
        user: String,
        old_password: String,
        password: String,
    },
    GrantRoles {
        user: String,
        roles: Vec<String>,
    },
    RevokeRoles {
        user: String,
        roles: Vec<String>,
    },
    /// `None` queries every user.
    QueryUsers {
        user: Option<String>,
    },
}

// Passwords are redacted; commands end up in debug logs.
impl fmt::Debug for AdminCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.name());
        if let Some(user) = self.target_user() {
            s.field("user", &user);
        }
        match self {
            AdminCommand::CreateUser { roles, .. }
            | AdminCommand::GrantRoles { roles, .. }
            | AdminCommand::RevokeRoles { roles, .. } => {
                s.field("roles", roles);
            }
            _ => {}
        }
        s.finish_non_exhaustive()
    }
}

impl AdminCommand {
    pub fn id(&self) -> CommandId {
        match self {
            AdminCommand::Login { .. } => CommandId::Login,
            AdminCommand::CreateUser { .. } => CommandId::CreateUser,
            AdminCommand::DropUser { .. } => CommandId::DropUser,
            AdminCommand::SetPassword { .. } => CommandId::SetPassword,
            AdminCommand::ChangePassword { .. } => CommandId::ChangePassword,
            AdminCommand::GrantRoles { .. } => CommandId::GrantRoles,
            AdminCommand::RevokeRoles { .. } => CommandId::RevokeRoles,
            AdminCommand::QueryUsers { .. } => CommandId::QueryUsers,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AdminCommand::Login { .. } => "login",
            AdminCommand::CreateUser { .. } => "create_user",
            AdminCommand::DropUser { .. } => "drop_user",
            AdminCommand::SetPassword { .. } => "set_password",
            AdminCommand::ChangePassword { .. } => "change_password",
            AdminCommand::GrantRoles { .. } => "grant_roles",
            AdminCommand::RevokeRoles { .. } => "revoke_roles",
            AdminCommand::QueryUsers { .. } => "query_users",
        }
    }

    /// The user the command acts on, if any.
    pub fn target_user(&self) -> Option<&str> {
        match self {
            AdminCommand::Login { user, .. }
            | AdminCommand::CreateUser { user, .. }
            | AdminCommand::DropUser { user }
            | AdminCommand::SetPassword { user, .. }
            | AdminCommand::ChangePassword { user, .. }
            | AdminCommand::GrantRoles { user, .. }
            | AdminCommand::RevokeRoles { user, .. } => Some(user),
            AdminCommand::QueryUsers { user } => user.as_deref(),
        }
    }

    /// True if the command always needs the `user-admin` role.
    pub fn requires_user_admin(&self) -> bool {
        matches!(
            self,
            AdminCommand::CreateUser { .. }
                | AdminCommand::DropUser { .. }
                | AdminCommand::SetPassword { .. }
                | AdminCommand::GrantRoles { .. }
                | AdminCommand::RevokeRoles { .. }
                | AdminCommand::QueryUsers { user: None }
        )
    }

    /// Serializes the command into a request frame.
    pub fn into_frame(self) -> Result<AdminFrame, AdminError> {
        let id = self.id() as u8;
        let fields = match self {
            AdminCommand::Login { user, password } | AdminCommand::SetPassword { user, password } => {
                vec![
                    AdminField::string(FieldId::User, &user),
                    AdminField::string(FieldId::Password, &password),
                ]
            }
            AdminCommand::CreateUser {
                user,
                password,
                roles,
            } => vec![
                AdminField::string(FieldId::User, &user),
                AdminField::string(FieldId::Password, &password),
                AdminField::roles(&roles)?,
            ],
            AdminCommand::DropUser { user } => vec![AdminField::string(FieldId::User, &user)],
            AdminCommand::ChangePassword {
                user,
                old_password,
                password,
            } => vec![
                AdminField::string(FieldId::User, &user),
                AdminField::string(FieldId::OldPassword, &old_password),
                AdminField::string(FieldId::Password, &password),
            ],
            AdminCommand::GrantRoles { user, roles } | AdminCommand::RevokeRoles { user, roles } => {
                vec![
                    AdminField::string(FieldId::User, &user),
                    AdminField::roles(&roles)?,
                ]
            }
            AdminCommand::QueryUsers { user } => user
                .map(|u| vec![AdminField::string(FieldId::User, &u)])
                .unwrap_or_default(),
        };
        Ok(AdminFrame::request(id, fields))
    }
}

fn required_string(frame: &AdminFrame, id: FieldId) -> Result<String, AdminError> {
    match frame.field(id) {
        Some(field) => field.as_string(),
        None => Err(missing_field(id)),
    }
}

fn required_roles(frame: &AdminFrame) -> Result<Vec<String>, AdminError> {
    match frame.field(FieldId::Roles) {
        Some(field) => field.as_roles(),
        None => Err(missing_field(FieldId::Roles)),
    }
}

fn missing_field(id: FieldId) -> AdminError {
    match id {
        FieldId::User => AdminError::InvalidUser,
        FieldId::Password | FieldId::OldPassword => AdminError::InvalidPassword,
        FieldId::Roles => AdminError::InvalidRole(InvalidRoleDetail::Empty),
    }
}

impl TryFrom<AdminFrame> for AdminCommand {
    type Error = AdminError;

    fn try_from(frame: AdminFrame) -> Result<Self, Self::Error> {
        for field in &frame.fields {
            FieldId::try_from(field.id)?;
        }
        let id = CommandId::try_from(frame.command)?;
        Ok(match id {
            CommandId::Login => AdminCommand::Login {
                user: required_string(&frame, FieldId::User)?,
                password: required_string(&frame, FieldId::Password)?,
            },
            CommandId::CreateUser => AdminCommand::CreateUser {
                user: required_string(&frame, FieldId::User)?,
                password: required_string(&frame, FieldId::Password)?,
                roles: required_roles(&frame)?,
            },
            CommandId::DropUser => AdminCommand::DropUser {
                user: required_string(&frame, FieldId::User)?,
            },
            CommandId::SetPassword => AdminCommand::SetPassword {
                user: required_string(&frame, FieldId::User)?,
                password: required_string(&frame, FieldId::Password)?,
            },
            CommandId::ChangePassword => AdminCommand::ChangePassword {
                user: required_string(&frame, FieldId::User)?,
                old_password: required_string(&frame, FieldId::OldPassword)?,
                password: required_string(&frame, FieldId::Password)?,
            },
            CommandId::GrantRoles => AdminCommand::GrantRoles {
                user: required_string(&frame, FieldId::User)?,
                roles: required_roles(&frame)?,
            },
            CommandId::RevokeRoles => AdminCommand::RevokeRoles {
                user: required_string(&frame, FieldId::User)?,
                roles: required_roles(&frame)?,
            },
            CommandId::QueryUsers => AdminCommand::QueryUsers {
                user: frame
                    .field(FieldId::User)
                    .map(AdminField::as_string)
                    .transpose()?,
            },
        })
    }
}
