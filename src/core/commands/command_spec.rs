// src/core/commands/command_spec.rs

//! Describes the callable surface of the dynamic bindings: each function's name
//! and its positional parameters. Used for arity checking and for `--help` output.

use std::fmt;
use thiserror::Error;

/// Metadata for one dynamically callable function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSpec {
    /// The function name as callers spell it.
    pub name: &'static str,
    /// Positional parameter names, required ones first.
    pub params: &'static [&'static str],
    /// How many leading parameters are required.
    pub required: usize,
}

/// A call with the wrong number of arguments. Never reaches the node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArityError {
    #[error("Required argument '{name}' (pos {position}) not found")]
    MissingArgument {
        function: &'static str,
        name: &'static str,
        position: usize,
    },

    #[error("{function}() takes at most {max} {} ({given} given)", plural(.max))]
    TooManyArguments {
        function: &'static str,
        max: usize,
        given: usize,
    },
}

fn plural(n: &usize) -> &'static str {
    if *n == 1 { "argument" } else { "arguments" }
}

impl FunctionSpec {
    /// The arity in the conventional form: positive for an exact count,
    /// negative for a minimum.
    pub fn arity(&self) -> i64 {
        if self.required == self.params.len() {
            self.params.len() as i64
        } else {
            -(self.required as i64)
        }
    }

    /// Checks a call with `given` positional arguments.
    pub fn check_arity(&self, given: usize) -> Result<(), ArityError> {
        if given < self.required {
            return Err(ArityError::MissingArgument {
                function: self.name,
                name: self.params[given],
                position: given + 1,
            });
        }
        if given > self.params.len() {
            return Err(ArityError::TooManyArguments {
                function: self.name,
                max: self.params.len(),
                given,
            });
        }
        Ok(())
    }
}

impl fmt::Display for FunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if i >= self.required {
                write!(f, "[{param}]")?;
            } else {
                f.write_str(param)?;
            }
        }
        f.write_str(")")
    }
}

pub const ADMIN_CREATE_USER: FunctionSpec = FunctionSpec {
    name: "admin_create_user",
    params: &["policy", "username", "password", "roles", "roles_size"],
    required: 5,
};
pub const ADMIN_DROP_USER: FunctionSpec = FunctionSpec {
    name: "admin_drop_user",
    params: &["policy", "username"],
    required: 2,
};
pub const ADMIN_QUERY_USER: FunctionSpec = FunctionSpec {
    name: "admin_query_user",
    params: &["policy", "username"],
    required: 2,
};
pub const ADMIN_QUERY_USERS: FunctionSpec = FunctionSpec {
    name: "admin_query_users",
    params: &["policy"],
    required: 1,
};
pub const ADMIN_GRANT_ROLES: FunctionSpec = FunctionSpec {
    name: "admin_grant_roles",
    params: &["policy", "username", "roles", "roles_size"],
    required: 4,
};
pub const ADMIN_REVOKE_ROLES: FunctionSpec = FunctionSpec {
    name: "admin_revoke_roles",
    params: &["policy", "username", "roles", "roles_size"],
    required: 4,
};
pub const ADMIN_SET_PASSWORD: FunctionSpec = FunctionSpec {
    name: "admin_set_password",
    params: &["policy", "username", "password"],
    required: 3,
};
pub const ADMIN_CHANGE_PASSWORD: FunctionSpec = FunctionSpec {
    name: "admin_change_password",
    params: &["policy", "username", "old_password", "new_password"],
    required: 4,
};
pub const SET_LOG_LEVEL: FunctionSpec = FunctionSpec {
    name: "set_log_level",
    params: &["level"],
    required: 1,
};
pub const ENABLE_LOG_HANDLER: FunctionSpec = FunctionSpec {
    name: "enable_log_handler",
    params: &["callback"],
    required: 0,
};

/// Every function the bindings expose.
pub const FUNCTIONS: &[FunctionSpec] = &[
    ADMIN_CREATE_USER,
    ADMIN_DROP_USER,
    ADMIN_QUERY_USER,
    ADMIN_QUERY_USERS,
    ADMIN_GRANT_ROLES,
    ADMIN_REVOKE_ROLES,
    ADMIN_SET_PASSWORD,
    ADMIN_CHANGE_PASSWORD,
    SET_LOG_LEVEL,
    ENABLE_LOG_HANDLER,
];

/// Looks up a function by name.
pub fn lookup(name: &str) -> Option<&'static FunctionSpec> {
    FUNCTIONS.iter().find(|spec| spec.name == name)
}
