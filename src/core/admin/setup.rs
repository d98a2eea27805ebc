// src/core/admin/setup.rs

//! Helpers for idempotent user setup and for waiting out propagation delays.

use super::AdminClient;
use crate::core::AdminError;
use crate::core::acl::User;
use crate::core::policy::Policy;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// What `ensure_user` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupOutcome {
    /// The user did not exist and was created.
    Created,
    /// An existing user was dropped and created again.
    Replaced,
}

impl AdminClient {
    /// Drops `user` if present, then creates it with the given password and roles.
    ///
    /// Only `InvalidUser` from the drop is treated as "absent"; any other failure
    /// is returned.
    pub async fn ensure_user<S: AsRef<str>>(
        &self,
        policy: &Policy,
        user: &str,
        password: &str,
        roles: &[S],
    ) -> Result<SetupOutcome, AdminError> {
        let outcome = match self.drop_user(policy, user).await {
            Ok(_) => SetupOutcome::Replaced,
            Err(AdminError::InvalidUser) => SetupOutcome::Created,
            Err(e) => return Err(e),
        };
        self.create_user(policy, user, password, roles).await?;
        debug!("ensure_user '{}': {:?}", user, outcome);
        Ok(outcome)
    }

    /// Polls `query_user` until the record satisfies `predicate` or `settle` elapses.
    ///
    /// While the user is not yet visible the query's `InvalidUser` is tolerated. If
    /// the window closes, the last query error is returned, or `Timeout` when the
    /// user was visible but never matched.
    pub async fn wait_for_user<F>(
        &self,
        policy: &Policy,
        user: &str,
        settle: Duration,
        predicate: F,
    ) -> Result<User, AdminError>
    where
        F: Fn(&User) -> bool,
    {
        let deadline = Instant::now() + settle;
        loop {
            let last_error = match self.query_user(policy, user).await {
                Ok(mut users) => match users.pop() {
                    Some(record) if predicate(&record) => return Ok(record),
                    _ => AdminError::Timeout,
                },
                Err(AdminError::InvalidUser) => AdminError::InvalidUser,
                Err(e) => return Err(e),
            };
            if Instant::now() >= deadline {
                return Err(last_error);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
