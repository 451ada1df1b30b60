//! prscribe — LLM-drafted pull request descriptions (library crate).
//!
//! Re-exports public modules for integration tests and external use.

pub mod bitbucket;
pub mod config;
pub mod constants;
pub mod diff;
pub mod env;
pub mod models;
pub mod optimizer;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod prompt;
pub mod providers;
