//! rune: one-shot CI/CD trust bootstrap (library crate).
//!
//! Re-exports public modules for integration tests and external use.

pub mod config;
pub mod constants;
pub mod env;
pub mod http;
pub mod keys;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod secret;
pub mod vcs;
