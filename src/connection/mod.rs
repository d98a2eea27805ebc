// src/connection/mod.rs

//! Manages the client side of a cluster session: seed selection, login,
//! request/response exchange and the connection lifecycle.

mod client;
mod session;

pub use client::Connection;
pub use session::{LinkState, Principal, SessionState};
