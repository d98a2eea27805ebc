// src/core/protocol/mod.rs

pub mod admin_frame;
pub mod fields;
pub use admin_frame::{AdminFrame, AdminFrameCodec};
pub use fields::{AdminField, FieldId};
