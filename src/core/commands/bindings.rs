// src/core/commands/bindings.rs

//! Dynamic invocation of the admin and logging calls with JSON arguments.
//!
//! A call is validated in a fixed order: arity, then the caller's permission,
//! then the policy, then argument types, then the declared role count. Only a
//! call that passes all of these is dispatched.

use super::command_spec::{self, ArityError, FunctionSpec};
use crate::core::AdminError;
use crate::core::admin::AdminClient;
use crate::core::errors::InvalidRoleDetail;
use crate::core::logging::{LogConfig, LogHandler};
use crate::core::policy::Policy;
use serde_json::{Value, json};
use std::fmt;
use thiserror::Error;

static NULL: Value = Value::Null;

/// One positional argument.
#[derive(Clone)]
pub enum Arg {
    Json(Value),
    /// A log handler, accepted by `enable_log_handler`.
    Callback(LogHandler),
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Json(v) => write!(f, "Json({v})"),
            Arg::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Json(value)
    }
}

impl Arg {
    /// The JSON value of the argument. A callback reads as `null`.
    fn json(&self) -> &Value {
        match self {
            Arg::Json(v) => v,
            Arg::Callback(_) => &NULL,
        }
    }
}

/// Failure of a dynamic call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvokeError {
    #[error(transparent)]
    Arity(#[from] ArityError),

    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),
}

impl InvokeError {
    /// The error code, for failures that carry one.
    pub fn code(&self) -> Option<i32> {
        match self {
            InvokeError::Admin(e) => Some(e.code()),
            _ => None,
        }
    }
}

/// The dynamic call surface over an optional admin connection and the log facade.
#[derive(Debug, Clone)]
pub struct Bindings {
    client: Option<AdminClient>,
    log: LogConfig,
}

impl Bindings {
    pub fn new(client: Option<AdminClient>, log: LogConfig) -> Self {
        Self { client, log }
    }

    pub fn log_config(&self) -> &LogConfig {
        &self.log
    }

    pub fn client(&self) -> Option<&AdminClient> {
        self.client.as_ref()
    }

    /// Invokes `function` with positional arguments.
    ///
    /// Status calls return `0`; queries return an array of user records.
    pub async fn invoke(&self, function: &str, args: Vec<Arg>) -> Result<Value, InvokeError> {
        let spec = command_spec::lookup(function)
            .ok_or_else(|| InvokeError::UnknownFunction(function.to_string()))?;
        spec.check_arity(args.len())?;

        match spec.name {
            "set_log_level" => Ok(json!(self.set_log_level(args[0].json())?)),
            "enable_log_handler" => Ok(json!(self.enable_log_handler(args.into_iter().next())?)),
            _ => self.invoke_admin(spec, &args).await.map_err(InvokeError::from),
        }
    }

    async fn invoke_admin(&self, spec: &FunctionSpec, args: &[Arg]) -> Result<Value, AdminError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| AdminError::Client("not connected".to_string()))?;

        if requires_user_admin(spec) {
            client.connection().require_user_admin().await?;
        }
        let policy = Policy::resolve(args[0].json())?;

        match spec.name {
            "admin_create_user" => {
                let user = username(&args[1])?;
                let password = password(&args[2])?;
                let roles = checked_roles(&args[3], &args[4])?;
                client.create_user(&policy, user, password, &roles).await.map(status)
            }
            "admin_drop_user" => client.drop_user(&policy, username(&args[1])?).await.map(status),
            "admin_query_user" => {
                let users = client.query_user(&policy, username(&args[1])?).await?;
                to_json(&users)
            }
            "admin_query_users" => to_json(&client.query_users(&policy).await?),
            "admin_grant_roles" => {
                let user = username(&args[1])?;
                let roles = checked_roles(&args[2], &args[3])?;
                client.grant_roles(&policy, user, &roles).await.map(status)
            }
            "admin_revoke_roles" => {
                let user = username(&args[1])?;
                let roles = checked_roles(&args[2], &args[3])?;
                client.revoke_roles(&policy, user, &roles).await.map(status)
            }
            "admin_set_password" => {
                let user = username(&args[1])?;
                let password = password(&args[2])?;
                client.set_password(&policy, user, password).await.map(status)
            }
            "admin_change_password" => {
                let user = username(&args[1])?;
                let old_password = password(&args[2])?;
                let new_password = password(&args[3])?;
                client
                    .change_password(&policy, user, old_password, new_password)
                    .await
                    .map(status)
            }
            other => Err(AdminError::Client(format!("'{other}' is not an admin function"))),
        }
    }

    fn set_log_level(&self, level: &Value) -> Result<i32, AdminError> {
        let raw = match level {
            Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(v), _) => Some(v),
                // Larger than i64::MAX; clamps to the top level anyway.
                (None, Some(_)) => Some(i64::MAX),
                (None, None) => None,
            },
            _ => None,
        };
        self.log.set_log_level(raw)
    }

    fn enable_log_handler(&self, callback: Option<Arg>) -> Result<i32, AdminError> {
        match callback {
            None | Some(Arg::Json(Value::Null)) => Ok(self.log.enable_log_handler(None)),
            Some(Arg::Callback(handler)) => Ok(self.log.enable_log_handler(Some(handler))),
            Some(Arg::Json(_)) => Err(AdminError::Param(
                "Log handler should be callable".to_string(),
            )),
        }
    }
}

fn requires_user_admin(spec: &FunctionSpec) -> bool {
    matches!(
        spec.name,
        "admin_create_user"
            | "admin_drop_user"
            | "admin_query_users"
            | "admin_grant_roles"
            | "admin_revoke_roles"
            | "admin_set_password"
    )
}

fn status(code: i32) -> Value {
    json!(code)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, AdminError> {
    serde_json::to_value(value).map_err(|e| AdminError::Client(format!("serialization failed: {e}")))
}

fn username(arg: &Arg) -> Result<&str, AdminError> {
    arg.json()
        .as_str()
        .ok_or_else(|| AdminError::Param("Username should be a string".to_string()))
}

fn password(arg: &Arg) -> Result<&str, AdminError> {
    arg.json()
        .as_str()
        .ok_or_else(|| AdminError::Param("Password should be a string".to_string()))
}

/// Extracts the role list and checks it against the declared count.
fn checked_roles<'a>(roles: &'a Arg, roles_size: &Arg) -> Result<Vec<&'a str>, AdminError> {
    let Value::Array(items) = roles.json() else {
        return Err(AdminError::Param("Roles should be a list".to_string()));
    };
    let names = items
        .iter()
        .map(|item| {
            item.as_str()
                .ok_or_else(|| AdminError::Param("Role should be a string".to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let declared = roles_size
        .json()
        .as_u64()
        .ok_or_else(|| AdminError::Param("Roles size should be a non-negative integer".to_string()))?;
    if declared != names.len() as u64 {
        return Err(AdminError::InvalidRole(InvalidRoleDetail::CountMismatch {
            declared: usize::try_from(declared).unwrap_or(usize::MAX),
            actual: names.len(),
        }));
    }
    Ok(names)
}
