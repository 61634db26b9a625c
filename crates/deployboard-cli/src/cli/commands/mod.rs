//! CLI command handlers.

pub mod assets;
pub mod auth;
pub mod config;
pub mod jobs;
