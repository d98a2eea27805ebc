// src/core/commands/mod.rs

//! The admin command set, the metadata of the dynamic call surface, and the
//! bindings that dispatch dynamic calls.

pub mod admin_command;
pub mod bindings;
pub mod command_spec;

pub use admin_command::{AdminCommand, CommandId};
pub use bindings::{Arg, Bindings, InvokeError};
pub use command_spec::{ArityError, FunctionSpec};
