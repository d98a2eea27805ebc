// src/server/actions.rs

//! Executes admin commands on the node.
//!
//! Checks run in a fixed order: security enabled, then authentication, then
//! permission, then argument validation. A caller without the needed role learns
//! nothing about whether its arguments were valid.

use super::state::NodeState;
use crate::config::SecurityConfig;
use crate::core::AdminError;
use crate::core::acl::role::parse_roles;
use crate::core::acl::{Role, User};
use crate::core::commands::{AdminCommand, CommandId};
use crate::core::errors::ResultCode;
use crate::core::protocol::{AdminField, AdminFrame, FieldId};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Per-connection authentication state on the node.
#[derive(Debug, Default)]
pub struct NodeSession {
    pub user: Option<String>,
}

/// Runs one command and returns the reply frames to send.
pub async fn execute(
    state: &NodeState,
    session: &mut NodeSession,
    command: AdminCommand,
) -> Result<Vec<AdminFrame>, AdminError> {
    let security = &state.config.security;
    if !security.enabled {
        return Err(AdminError::SecurityNotEnabled);
    }

    let command = match command {
        AdminCommand::Login { user, password } => {
            return login(state, session, user, password).await;
        }
        other => other,
    };

    let Some(current) = session.user.as_deref() else {
        return Err(AdminError::NotAuthenticated);
    };
    // A dropped user loses its open sessions.
    let roles = state
        .users
        .roles_of(current)
        .ok_or(AdminError::NotAuthenticated)?;

    check_permission(&command, current, &roles)?;
    validate(&command, security)?;

    let id = command.id() as u8;
    match command {
        AdminCommand::CreateUser {
            user,
            password,
            roles,
        } => {
            state.users.create(&user, &password, parse_roles(&roles)?)?;
            info!("User '{}' created by '{}'.", user, current);
            Ok(vec![ok(id)])
        }
        AdminCommand::DropUser { user } => {
            state.users.drop_user(&user)?;
            info!("User '{}' dropped by '{}'.", user, current);
            Ok(vec![ok(id)])
        }
        AdminCommand::SetPassword { user, password } => {
            state.users.set_password(&user, &password)?;
            info!("Password of '{}' reset by '{}'.", user, current);
            Ok(vec![ok(id)])
        }
        AdminCommand::ChangePassword {
            user,
            old_password,
            password,
        } => {
            state.users.change_password(&user, &old_password, &password)?;
            info!("User '{}' changed their password.", user);
            Ok(vec![ok(id)])
        }
        AdminCommand::GrantRoles { user, roles } => {
            state.users.grant_roles(&user, &parse_roles(&roles)?)?;
            Ok(vec![ok(id)])
        }
        AdminCommand::RevokeRoles { user, roles } => {
            state.users.revoke_roles(&user, &parse_roles(&roles)?)?;
            Ok(vec![ok(id)])
        }
        AdminCommand::QueryUsers { user: Some(user) } => {
            let record = state.users.query(&user).ok_or(AdminError::InvalidUser)?;
            Ok(vec![record_frame(id, &record)?, end(id)])
        }
        AdminCommand::QueryUsers { user: None } => {
            let mut frames = state
                .users
                .query_all()
                .iter()
                .map(|record| record_frame(id, record))
                .collect::<Result<Vec<_>, _>>()?;
            frames.push(end(id));
            Ok(frames)
        }
        AdminCommand::Login { .. } => Err(AdminError::Server(ResultCode::InvalidCommand as u8)),
    }
}

async fn login(
    state: &NodeState,
    session: &mut NodeSession,
    user: String,
    password: String,
) -> Result<Vec<AdminFrame>, AdminError> {
    match state.users.authenticate(&user, &password) {
        Some(roles) => {
            debug!("User '{}' logged in.", user);
            session.user = Some(user);
            let names: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
            Ok(vec![AdminFrame::reply(
                CommandId::Login as u8,
                ResultCode::Ok as u8,
                vec![AdminField::roles(&names)?],
            )])
        }
        None => {
            warn!("Failed login attempt for user '{}'.", user);
            // Add a delay on failure to slow down guessing.
            tokio::time::sleep(state.config.security.login_failure_delay).await;
            Err(AdminError::InvalidCredential)
        }
    }
}

fn check_permission(
    command: &AdminCommand,
    current: &str,
    roles: &BTreeSet<Role>,
) -> Result<(), AdminError> {
    let is_admin = roles.iter().any(|r| r.can_manage_users());
    let allowed = match command {
        AdminCommand::ChangePassword { user, .. } => user == current,
        AdminCommand::QueryUsers { user: Some(user) } => is_admin || user == current,
        other => !other.requires_user_admin() || is_admin,
    };
    if allowed {
        Ok(())
    } else {
        Err(AdminError::RoleViolation)
    }
}

fn validate(command: &AdminCommand, security: &SecurityConfig) -> Result<(), AdminError> {
    if let Some(user) = command.target_user()
        && (user.is_empty() || user.len() > security.max_user_len)
    {
        return Err(AdminError::InvalidUser);
    }
    match command {
        AdminCommand::CreateUser {
            password, roles, ..
        } => {
            check_password(password, security)?;
            parse_roles(roles)?;
        }
        AdminCommand::SetPassword { password, .. }
        | AdminCommand::ChangePassword { password, .. } => check_password(password, security)?,
        AdminCommand::GrantRoles { roles, .. } | AdminCommand::RevokeRoles { roles, .. } => {
            parse_roles(roles)?;
        }
        _ => {}
    }
    Ok(())
}

fn check_password(password: &str, security: &SecurityConfig) -> Result<(), AdminError> {
    if password.len() > security.max_password_len {
        Err(AdminError::InvalidPassword)
    } else {
        Ok(())
    }
}

fn ok(command: u8) -> AdminFrame {
    AdminFrame::reply(command, ResultCode::Ok as u8, Vec::new())
}

fn end(command: u8) -> AdminFrame {
    AdminFrame::reply(command, ResultCode::QueryEnd as u8, Vec::new())
}

fn record_frame(command: u8, record: &User) -> Result<AdminFrame, AdminError> {
    Ok(AdminFrame::reply(
        command,
        ResultCode::Ok as u8,
        vec![
            AdminField::string(FieldId::User, &record.user),
            AdminField::roles(&record.roles)?,
        ],
    ))
}
