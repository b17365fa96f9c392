//! CLI command handlers

pub mod index;
pub mod query;
pub mod status;
