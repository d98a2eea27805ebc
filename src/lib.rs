// src/lib.rs

pub mod config;
pub mod connection;
pub mod core;
pub mod server;

// Re-export
pub use crate::config::{ClientConfig, Credentials, NodeConfig};
pub use crate::connection::Connection;
pub use crate::core::{AdminClient, AdminError, LogConfig, LogLevel, Policy};
