//! Core deployboard library (auth session, jobs API, pollers, config).

pub mod auth;
pub mod config;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod poll;

pub use error::{Error, Result};
