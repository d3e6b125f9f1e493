pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod graph;
pub mod plugins;

// Re-export for main.rs and integration tests
pub use crate::commands::{create_cluster, delete_cluster, CommandError, CreateOutcome};
pub use crate::config::Settings;
pub use crate::engine::{Engine, PulumiCli, Stack, StackRef};
