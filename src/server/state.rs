// src/server/state.rs

//! The shared state of an admin node.

use super::user_store::UserStore;
use crate::config::NodeConfig;
use crate::core::acl::role::parse_roles;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::info;

/// Counters reported when the node shuts down.
#[derive(Debug, Default)]
pub struct NodeStats {
    pub total_connections: AtomicU64,
    pub connected_clients: AtomicUsize,
    pub commands_processed: AtomicU64,
}

impl NodeStats {
    pub fn increment_total_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_commands_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }
}

/// State shared by every connection handler of one node.
pub struct NodeState {
    pub config: NodeConfig,
    pub users: UserStore,
    pub stats: NodeStats,
}

impl NodeState {
    /// Builds the node state and loads the seed users.
    pub fn initialize(config: NodeConfig) -> Result<Self> {
        let users = UserStore::new(config.propagation_delay)?;

        if config.security.enabled {
            for seed in &config.security.users {
                let roles = if seed.roles.is_empty() {
                    BTreeSet::new()
                } else {
                    parse_roles(&seed.roles)
                        .with_context(|| format!("Invalid roles for seed user '{}'", seed.name))?
                };
                users
                    .seed(&seed.name, &seed.password, roles)
                    .with_context(|| format!("Failed to store seed user '{}'", seed.name))?;
            }
            info!("Loaded {} seed user(s).", users.len());
        }

        Ok(Self {
            config,
            users,
            stats: NodeStats::default(),
        })
    }
}
