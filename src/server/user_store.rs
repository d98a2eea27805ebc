// src/server/user_store.rs

//! The node's user table.
//!
//! Writes commit immediately: later writes and logins see them at once. Queries
//! read a separate visible view that only catches up after the propagation
//! delay, which models a change spreading through a cluster.

use crate::core::AdminError;
use crate::core::acl::{Role, User};
use crate::core::errors::ResultCode;
use anyhow::anyhow;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use parking_lot::Mutex;
use rand::rngs::OsRng;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

// Argon2id cost parameters for stored password hashes.
const HASH_MEMORY_KIB: u32 = 4096;
const HASH_ITERATIONS: u32 = 1;

struct StoredUser {
    password_hash: String,
    roles: BTreeSet<Role>,
}

/// A committed change not yet visible to queries. `None` roles mark a removal.
struct PendingChange {
    ready_at: Instant,
    user: String,
    roles: Option<BTreeSet<Role>>,
}

#[derive(Default)]
struct StoreInner {
    committed: HashMap<String, StoredUser>,
    visible: BTreeMap<String, BTreeSet<Role>>,
    pending: VecDeque<PendingChange>,
}

pub struct UserStore {
    inner: Mutex<StoreInner>,
    hasher: Argon2<'static>,
    propagation_delay: Duration,
}

impl UserStore {
    pub fn new(propagation_delay: Duration) -> anyhow::Result<Self> {
        let params = Params::new(HASH_MEMORY_KIB, HASH_ITERATIONS, 1, None)
            .map_err(|e| anyhow!("Invalid password hashing parameters: {e}"))?;
        Ok(Self {
            inner: Mutex::new(StoreInner::default()),
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            propagation_delay,
        })
    }

    /// Adds a user that is visible immediately, regardless of the propagation delay.
    pub fn seed(&self, user: &str, password: &str, roles: BTreeSet<Role>) -> Result<(), AdminError> {
        let password_hash = self.hash(password)?;
        let mut inner = self.inner.lock();
        inner.visible.insert(user.to_string(), roles.clone());
        inner.committed.insert(
            user.to_string(),
            StoredUser {
                password_hash,
                roles,
            },
        );
        Ok(())
    }

    /// Verifies a login and returns the user's current roles.
    pub fn authenticate(&self, user: &str, password: &str) -> Option<BTreeSet<Role>> {
        let (hash, roles) = {
            let inner = self.inner.lock();
            let stored = inner.committed.get(user)?;
            (stored.password_hash.clone(), stored.roles.clone())
        };
        self.verify(password, &hash).then_some(roles)
    }

    /// The committed roles of `user`, or `None` if the user does not exist.
    pub fn roles_of(&self, user: &str) -> Option<BTreeSet<Role>> {
        self.inner.lock().committed.get(user).map(|u| u.roles.clone())
    }

    pub fn create(&self, user: &str, password: &str, roles: BTreeSet<Role>) -> Result<(), AdminError> {
        if self.inner.lock().committed.contains_key(user) {
            return Err(AdminError::UserAlreadyExists);
        }
        let password_hash = self.hash(password)?;

        let mut inner = self.inner.lock();
        // Re-check: another session may have created the user while we were hashing.
        if inner.committed.contains_key(user) {
            return Err(AdminError::UserAlreadyExists);
        }
        inner.committed.insert(
            user.to_string(),
            StoredUser {
                password_hash,
                roles: roles.clone(),
            },
        );
        self.publish(&mut inner, user, Some(roles));
        Ok(())
    }

    pub fn drop_user(&self, user: &str) -> Result<(), AdminError> {
        let mut inner = self.inner.lock();
        if inner.committed.remove(user).is_none() {
            return Err(AdminError::InvalidUser);
        }
        self.publish(&mut inner, user, None);
        Ok(())
    }

    pub fn set_password(&self, user: &str, password: &str) -> Result<(), AdminError> {
        if !self.inner.lock().committed.contains_key(user) {
            return Err(AdminError::InvalidUser);
        }
        let password_hash = self.hash(password)?;
        match self.inner.lock().committed.get_mut(user) {
            Some(stored) => {
                stored.password_hash = password_hash;
                Ok(())
            }
            None => Err(AdminError::InvalidUser),
        }
    }

    /// Replaces the password after checking the old one.
    pub fn change_password(&self, user: &str, old_password: &str, password: &str) -> Result<(), AdminError> {
        let hash = match self.inner.lock().committed.get(user) {
            Some(stored) => stored.password_hash.clone(),
            None => return Err(AdminError::InvalidUser),
        };
        if !self.verify(old_password, &hash) {
            return Err(AdminError::InvalidPassword);
        }
        self.set_password(user, password)
    }

    pub fn grant_roles(&self, user: &str, roles: &BTreeSet<Role>) -> Result<(), AdminError> {
        self.update_roles(user, |current| current.extend(roles.iter().copied()))
    }

    pub fn revoke_roles(&self, user: &str, roles: &BTreeSet<Role>) -> Result<(), AdminError> {
        self.update_roles(user, |current| current.retain(|r| !roles.contains(r)))
    }

    fn update_roles(&self, user: &str, apply: impl FnOnce(&mut BTreeSet<Role>)) -> Result<(), AdminError> {
        let mut inner = self.inner.lock();
        let stored = inner.committed.get_mut(user).ok_or(AdminError::InvalidUser)?;
        apply(&mut stored.roles);
        let roles = stored.roles.clone();
        self.publish(&mut inner, user, Some(roles));
        Ok(())
    }

    /// The visible record of one user.
    pub fn query(&self, user: &str) -> Option<User> {
        let mut inner = self.inner.lock();
        apply_due(&mut inner);
        inner.visible.get(user).map(|roles| to_record(user, roles))
    }

    /// Every visible user, sorted by name.
    pub fn query_all(&self) -> Vec<User> {
        let mut inner = self.inner.lock();
        apply_due(&mut inner);
        inner
            .visible
            .iter()
            .map(|(user, roles)| to_record(user, roles))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Committed changes still waiting to become visible.
    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    fn publish(&self, inner: &mut StoreInner, user: &str, roles: Option<BTreeSet<Role>>) {
        apply_due(inner);
        if self.propagation_delay.is_zero() {
            apply_change(inner, user.to_string(), roles);
            return;
        }
        inner.pending.push_back(PendingChange {
            ready_at: Instant::now() + self.propagation_delay,
            user: user.to_string(),
            roles,
        });
    }

    fn hash(&self, password: &str) -> Result<String, AdminError> {
        let salt = SaltString::generate(&mut OsRng);
        self.hasher
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|_| AdminError::Server(ResultCode::ServerError as u8))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self.hasher.verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }
}

// The delay is constant, so the queue is ordered by `ready_at`.
fn apply_due(inner: &mut StoreInner) {
    let now = Instant::now();
    while inner.pending.front().is_some_and(|c| c.ready_at <= now) {
        if let Some(change) = inner.pending.pop_front() {
            debug!("Change to user '{}' is now visible.", change.user);
            apply_change(inner, change.user, change.roles);
        }
    }
}

fn apply_change(inner: &mut StoreInner, user: String, roles: Option<BTreeSet<Role>>) {
    match roles {
        Some(roles) => {
            inner.visible.insert(user, roles);
        }
        None => {
            inner.visible.remove(&user);
        }
    }
}

fn to_record(user: &str, roles: &BTreeSet<Role>) -> User {
    User::new(user, roles.iter().map(|r| r.to_string()).collect())
}
