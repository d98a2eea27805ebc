// src/core/mod.rs

//! The core types shared by the admin client and the admin node.

pub mod acl;
pub mod admin;
pub mod commands;
pub mod errors;
pub mod logging;
pub mod policy;
pub mod protocol;

pub use admin::{AdminClient, SetupOutcome};
pub use errors::AdminError;
pub use logging::{LogConfig, LogLevel};
pub use policy::Policy;
