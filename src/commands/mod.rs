//! Command implementations
//!
//! Each command resolves configuration first and only then talks to the
//! engine, so a missing organization never reaches it. Every failure is
//! returned to the caller with the step that failed.

pub mod create;
pub mod delete;

pub use create::{create_cluster, CreateOutcome, DRY_RUN_MESSAGE};
pub use delete::delete_cluster;

use crate::config::ConfigError;
use crate::engine::{EngineError, StackRefError};
use crate::graph::GraphError;
use crate::plugins::Provider;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("must specify pulumi org via flag, AKSCTL_ORG or config file")]
    MissingConfiguration,

    #[error("configuration error")]
    Config(#[source] ConfigError),

    #[error("invalid stack reference")]
    InvalidStack(#[from] StackRefError),

    #[error("error building resource graph")]
    Registration(#[from] GraphError),

    #[error("failed to create or select stack {stack}")]
    StackInit {
        stack: String,
        #[source]
        source: EngineError,
    },

    #[error("error installing {} plugin {}", .plugin.name(), .plugin.version())]
    PluginInstall {
        plugin: Provider,
        #[source]
        source: EngineError,
    },

    #[error("error previewing stack {stack}")]
    Preview {
        stack: String,
        #[source]
        source: EngineError,
    },

    #[error("error updating stack {stack}")]
    Apply {
        stack: String,
        #[source]
        source: EngineError,
    },

    #[error("error destroying stack {stack}")]
    StackDestroy {
        stack: String,
        #[source]
        source: EngineError,
    },
}

impl From<ConfigError> for CommandError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::MissingConfiguration => CommandError::MissingConfiguration,
            other => CommandError::Config(other),
        }
    }
}

/// Version string printed by `aksctl version`
pub fn version() -> String {
    format!("aksctl {}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_configuration_maps_to_its_own_variant() {
        let error: CommandError = ConfigError::MissingConfiguration.into();
        assert!(matches!(error, CommandError::MissingConfiguration));
    }

    #[test]
    fn test_other_config_errors_are_wrapped() {
        let error: CommandError = ConfigError::NoHomeDirectory.into();
        assert!(matches!(error, CommandError::Config(ConfigError::NoHomeDirectory)));
    }

    #[test]
    fn test_plugin_install_names_the_plugin() {
        let error = CommandError::PluginInstall {
            plugin: Provider::Random,
            source: EngineError::CommandFailed {
                command: "pulumi plugin install".to_string(),
                code: 1,
                stderr: "network unreachable".to_string(),
            },
        };
        assert_eq!(error.to_string(), "error installing random plugin v2.3.1");
    }

    #[test]
    fn test_version() {
        assert_eq!(version(), format!("aksctl {}", env!("CARGO_PKG_VERSION")));
        assert!(version().starts_with("aksctl "));
    }
}
