// src/core/policy.rs

//! Per-call options and their validation.

use crate::core::AdminError;
use serde_json::Value;
use std::time::Duration;

/// Per-call options for an admin command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    /// `None` defers to the connection's default timeout.
    pub timeout: Option<Duration>,
}

impl Policy {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: (!timeout.is_zero()).then_some(timeout),
        }
    }

    /// Validates and normalizes a raw option mapping.
    ///
    /// The raw form must be a mapping. `timeout`, when present, must be a
    /// non-negative integer number of milliseconds; `0` means no per-call timeout.
    /// Unrecognized keys are ignored.
    pub fn resolve(raw: &Value) -> Result<Self, AdminError> {
        let Value::Object(options) = raw else {
            return Err(AdminError::Param("policy must be a dict".to_string()));
        };

        let timeout = match options.get("timeout") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => match n.as_u64() {
                Some(0) => None,
                Some(ms) => Some(Duration::from_millis(ms)),
                None => return Err(AdminError::Param("timeout is invalid".to_string())),
            },
            Some(_) => return Err(AdminError::Param("timeout is invalid".to_string())),
        };

        Ok(Self { timeout })
    }

    /// The timeout that bounds a call: the policy's own, else the connection default.
    pub fn effective_timeout(&self, default: Option<Duration>) -> Option<Duration> {
        self.timeout.or(default)
    }
}
