//! CLI command implementations.

pub mod chat;
pub mod format;
pub mod validate;
pub mod view;
