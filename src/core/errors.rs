// src/core/errors.rs

//! Defines the primary error type for the admin client and the admin node.
//!
//! Every failure carries a numeric `code` and a human-readable `msg`. Callers branch
//! on the code; the message is either the caller-facing parameter text or the
//! canonical name of the cluster result code.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result codes exchanged on the wire, in the admin header's result byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResultCode {
    Ok = 0,
    ServerError = 1,
    Timeout = 9,
    QueryEnd = 50,
    SecurityNotSupported = 51,
    SecurityNotEnabled = 52,
    InvalidCommand = 54,
    InvalidField = 55,
    InvalidUser = 60,
    UserAlreadyExists = 61,
    InvalidPassword = 62,
    ExpiredPassword = 63,
    ForbiddenPassword = 64,
    InvalidCredential = 65,
    InvalidRole = 70,
    RoleAlreadyExists = 71,
    NotAuthenticated = 80,
    RoleViolation = 81,
}

impl ResultCode {
    /// The canonical name reported as the error message.
    pub fn name(self) -> &'static str {
        match self {
            ResultCode::Ok => "AEROSPIKE_OK",
            ResultCode::ServerError => "AEROSPIKE_ERR_SERVER",
            ResultCode::Timeout => "AEROSPIKE_ERR_TIMEOUT",
            ResultCode::QueryEnd => "AEROSPIKE_QUERY_END",
            ResultCode::SecurityNotSupported => "AEROSPIKE_SECURITY_NOT_SUPPORTED",
            ResultCode::SecurityNotEnabled => "AEROSPIKE_SECURITY_NOT_ENABLED",
            ResultCode::InvalidCommand => "AEROSPIKE_INVALID_COMMAND",
            ResultCode::InvalidField => "AEROSPIKE_INVALID_FIELD",
            ResultCode::InvalidUser => "AEROSPIKE_INVALID_USER",
            ResultCode::UserAlreadyExists => "AEROSPIKE_USER_ALREADY_EXISTS",
            ResultCode::InvalidPassword => "AEROSPIKE_INVALID_PASSWORD",
            ResultCode::ExpiredPassword => "AEROSPIKE_EXPIRED_PASSWORD",
            ResultCode::ForbiddenPassword => "AEROSPIKE_FORBIDDEN_PASSWORD",
            ResultCode::InvalidCredential => "AEROSPIKE_INVALID_CREDENTIAL",
            ResultCode::InvalidRole => "AEROSPIKE_INVALID_ROLE",
            ResultCode::RoleAlreadyExists => "AEROSPIKE_ROLE_ALREADY_EXISTS",
            ResultCode::NotAuthenticated => "AEROSPIKE_NOT_AUTHENTICATED",
            ResultCode::RoleViolation => "AEROSPIKE_ROLE_VIOLATION",
        }
    }
}

impl TryFrom<u8> for ResultCode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => ResultCode::Ok,
            1 => ResultCode::ServerError,
            9 => ResultCode::Timeout,
            50 => ResultCode::QueryEnd,
            51 => ResultCode::SecurityNotSupported,
            52 => ResultCode::SecurityNotEnabled,
            54 => ResultCode::InvalidCommand,
            55 => ResultCode::InvalidField,
            60 => ResultCode::InvalidUser,
            61 => ResultCode::UserAlreadyExists,
            62 => ResultCode::InvalidPassword,
            63 => ResultCode::ExpiredPassword,
            64 => ResultCode::ForbiddenPassword,
            65 => ResultCode::InvalidCredential,
            70 => ResultCode::InvalidRole,
            71 => ResultCode::RoleAlreadyExists,
            80 => ResultCode::NotAuthenticated,
            81 => ResultCode::RoleViolation,
            other => return Err(other),
        })
    }
}

/// Distinguishes the conditions that all surface as `InvalidRole`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidRoleDetail {
    /// The role list was empty.
    Empty,
    /// A role name is not one the cluster knows.
    Unknown(String),
    /// The declared role count does not match the list length.
    CountMismatch { declared: usize, actual: usize },
    /// Reported by the node without further detail.
    Reported,
}

impl fmt::Display for InvalidRoleDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidRoleDetail::Empty => write!(f, "role list is empty"),
            InvalidRoleDetail::Unknown(name) => write!(f, "unknown role '{name}'"),
            InvalidRoleDetail::CountMismatch { declared, actual } => {
                write!(f, "declared {declared} roles but {actual} were given")
            }
            InvalidRoleDetail::Reported => write!(f, "rejected by the cluster"),
        }
    }
}

/// The main error enum for every admin operation.
#[derive(Error, Debug)]
pub enum AdminError {
    /// A malformed or wrongly-typed argument, detected before any network round trip.
    #[error("{0}")]
    Param(String),

    #[error("{0}")]
    Client(String),

    #[error("Connection error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Connection error: {0}")]
    Unreachable(String),

    #[error("AEROSPIKE_ERR_TIMEOUT")]
    Timeout,

    #[error("AEROSPIKE_SECURITY_NOT_ENABLED")]
    SecurityNotEnabled,

    #[error("AEROSPIKE_INVALID_USER")]
    InvalidUser,

    #[error("AEROSPIKE_USER_ALREADY_EXISTS")]
    UserAlreadyExists,

    #[error("AEROSPIKE_INVALID_PASSWORD")]
    InvalidPassword,

    #[error("AEROSPIKE_INVALID_CREDENTIAL")]
    InvalidCredential,

    #[error("AEROSPIKE_INVALID_ROLE")]
    InvalidRole(InvalidRoleDetail),

    #[error("AEROSPIKE_NOT_AUTHENTICATED")]
    NotAuthenticated,

    #[error("AEROSPIKE_ROLE_VIOLATION")]
    RoleViolation,

    /// Any other result code the node reported.
    #[error("{}", server_code_name(.0))]
    Server(u8),
}

fn server_code_name(code: &u8) -> &'static str {
    ResultCode::try_from(*code)
        .map(ResultCode::name)
        .unwrap_or("AEROSPIKE_ERR_SERVER")
}

impl AdminError {
    /// The numeric code callers branch on.
    pub fn code(&self) -> i32 {
        match self {
            AdminError::Param(_) => -2,
            AdminError::Client(_) => -1,
            AdminError::Io(_) | AdminError::Unreachable(_) => -10,
            AdminError::Timeout => ResultCode::Timeout as i32,
            AdminError::SecurityNotEnabled => ResultCode::SecurityNotEnabled as i32,
            AdminError::InvalidUser => ResultCode::InvalidUser as i32,
            AdminError::UserAlreadyExists => ResultCode::UserAlreadyExists as i32,
            AdminError::InvalidPassword => ResultCode::InvalidPassword as i32,
            AdminError::InvalidCredential => ResultCode::InvalidCredential as i32,
            AdminError::InvalidRole(_) => ResultCode::InvalidRole as i32,
            AdminError::NotAuthenticated => ResultCode::NotAuthenticated as i32,
            AdminError::RoleViolation => ResultCode::RoleViolation as i32,
            AdminError::Server(code) => *code as i32,
        }
    }

    /// The human-readable message paired with `code()`.
    pub fn msg(&self) -> String {
        self.to_string()
    }

    pub fn closed() -> Self {
        AdminError::Client("connection is closed".to_string())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        AdminError::Client(format!("protocol error: {}", msg.into()))
    }

    /// True for failures that leave the link in an unknown state and require a reconnect.
    pub(crate) fn breaks_link(&self) -> bool {
        matches!(
            self,
            AdminError::Io(_) | AdminError::Timeout | AdminError::Client(_)
        )
    }

    /// Maps a node-reported result code to an error. `Ok` and `QueryEnd` are not errors.
    pub fn from_result_code(code: u8) -> Option<Self> {
        let Ok(known) = ResultCode::try_from(code) else {
            return Some(AdminError::Server(code));
        };
        Some(match known {
            ResultCode::Ok | ResultCode::QueryEnd => return None,
            ResultCode::Timeout => AdminError::Timeout,
            ResultCode::SecurityNotEnabled => AdminError::SecurityNotEnabled,
            ResultCode::InvalidUser => AdminError::InvalidUser,
            ResultCode::UserAlreadyExists => AdminError::UserAlreadyExists,
            ResultCode::InvalidPassword => AdminError::InvalidPassword,
            ResultCode::InvalidCredential => AdminError::InvalidCredential,
            ResultCode::InvalidRole => AdminError::InvalidRole(InvalidRoleDetail::Reported),
            ResultCode::NotAuthenticated => AdminError::NotAuthenticated,
            ResultCode::RoleViolation => AdminError::RoleViolation,
            other => AdminError::Server(other as u8),
        })
    }

    /// The result code a node writes back for this error.
    pub fn result_code(&self) -> u8 {
        match self.code() {
            code @ 0..=255 => code as u8,
            _ => ResultCode::ServerError as u8,
        }
    }
}

// Manual implementation of Clone because `std::io::Error` is not cloneable.
impl Clone for AdminError {
    fn clone(&self) -> Self {
        match self {
            AdminError::Param(s) => AdminError::Param(s.clone()),
            AdminError::Client(s) => AdminError::Client(s.clone()),
            AdminError::Io(e) => AdminError::Io(Arc::clone(e)),
            AdminError::Unreachable(s) => AdminError::Unreachable(s.clone()),
            AdminError::Timeout => AdminError::Timeout,
            AdminError::SecurityNotEnabled => AdminError::SecurityNotEnabled,
            AdminError::InvalidUser => AdminError::InvalidUser,
            AdminError::UserAlreadyExists => AdminError::UserAlreadyExists,
            AdminError::InvalidPassword => AdminError::InvalidPassword,
            AdminError::InvalidCredential => AdminError::InvalidCredential,
            AdminError::InvalidRole(d) => AdminError::InvalidRole(d.clone()),
            AdminError::NotAuthenticated => AdminError::NotAuthenticated,
            AdminError::RoleViolation => AdminError::RoleViolation,
            AdminError::Server(c) => AdminError::Server(*c),
        }
    }
}

impl PartialEq for AdminError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AdminError::Io(e1), AdminError::Io(e2)) => e1.to_string() == e2.to_string(),
            (AdminError::Param(s1), AdminError::Param(s2)) => s1 == s2,
            (AdminError::Client(s1), AdminError::Client(s2)) => s1 == s2,
            (AdminError::Unreachable(s1), AdminError::Unreachable(s2)) => s1 == s2,
            (AdminError::InvalidRole(d1), AdminError::InvalidRole(d2)) => d1 == d2,
            (AdminError::Server(c1), AdminError::Server(c2)) => c1 == c2,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl From<std::io::Error> for AdminError {
    fn from(e: std::io::Error) -> Self {
        AdminError::Io(Arc::new(e))
    }
}

impl From<std::string::FromUtf8Error> for AdminError {
    fn from(_: std::string::FromUtf8Error) -> Self {
        AdminError::protocol("field is not valid UTF-8")
    }
}

impl From<tokio::time::error::Elapsed> for AdminError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        AdminError::Timeout
    }
}
