// src/core/acl/mod.rs

//! Roles and user records shared by the client and the admin node.

pub mod role;
pub mod user;

pub use role::Role;
pub use user::User;
