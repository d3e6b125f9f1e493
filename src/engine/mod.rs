//! Infrastructure-as-code engine seam
//!
//! Planning, diffing, state storage and resource lifecycle belong to the
//! external engine. This module defines the small automation surface the
//! commands need:
//! - `Engine`: create-or-select and select a named stack
//! - `Stack`: install plugins, preview, apply, destroy
//!
//! `PulumiCli` drives the pulumi binary; tests substitute a recording engine.

#[cfg(test)]
pub mod mock;
pub mod pulumi;

pub use pulumi::PulumiCli;

use crate::graph::ResourceGraph;
use crate::plugins::Provider;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to run {command}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with status {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("engine I/O error")]
    Io(#[from] std::io::Error),

    #[error("failed to render program")]
    Render(#[from] serde_yaml::Error),

    #[error("invalid stack reference")]
    InvalidStack(#[from] StackRefError),
}

/// A stack identifier component that cannot name a stack or a workspace directory
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StackRefError {
    #[error("{part} must not be empty")]
    Empty { part: &'static str },

    #[error("{part} {value:?} must be a single path segment")]
    NotASegment { part: &'static str, value: String },
}

/// Fully-qualified stack identifier, `org/project/stack`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackRef {
    pub org: String,
    pub project: String,
    pub stack: String,
}

impl StackRef {
    pub fn new(
        org: impl Into<String>,
        project: impl Into<String>,
        stack: impl Into<String>,
    ) -> Self {
        StackRef {
            org: org.into(),
            project: project.into(),
            stack: stack.into(),
        }
    }
}

impl StackRef {
    /// Check every component is a plain, non-empty name
    ///
    /// Components become directory names under the workspace root, so
    /// separators and `.`/`..` are rejected along with blanks.
    pub fn validate(&self) -> Result<(), StackRefError> {
        for (part, value) in [
            ("org", &self.org),
            ("project", &self.project),
            ("stack", &self.stack),
        ] {
            if value.trim().is_empty() {
                return Err(StackRefError::Empty { part });
            }
            if value == "."
                || value == ".."
                || value.contains(['/', '\\'])
                || std::path::Path::new(value.as_str()).is_absolute()
            {
                return Err(StackRefError::NotASegment {
                    part,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for StackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.org, self.project, self.stack)
    }
}

/// Options for a plan-only run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewOptions {
    /// Message attached to the preview
    pub message: Option<String>,
}

impl PreviewOptions {
    pub fn with_message(message: impl Into<String>) -> Self {
        PreviewOptions {
            message: Some(message.into()),
        }
    }
}

/// Outcome of a preview
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewResult {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Engine's rendering of the planned changes
    pub output: String,
}

/// Outcome of an apply or destroy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of progress lines the engine reported
    pub output_lines: usize,
}

impl UpdateResult {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Entry point into the external engine
#[async_trait]
pub trait Engine: Send + Sync {
    /// Create the stack if it does not exist, otherwise select it
    ///
    /// `program` is the resource graph the stack deploys.
    async fn upsert_stack(
        &self,
        stack: &StackRef,
        program: &ResourceGraph,
    ) -> Result<Box<dyn Stack>, EngineError>;

    /// Select an existing stack without supplying a program
    async fn select_stack(&self, stack: &StackRef) -> Result<Box<dyn Stack>, EngineError>;
}

/// Handle to a selected stack
#[async_trait]
pub trait Stack: Send + Sync {
    fn stack_ref(&self) -> &StackRef;

    /// Install a provider plugin into the stack's workspace
    async fn install_plugin(&self, provider: Provider) -> Result<(), EngineError>;

    /// Compute changes without applying them
    async fn preview(&self, options: &PreviewOptions) -> Result<PreviewResult, EngineError>;

    /// Apply the program, forwarding progress lines to `progress` as they arrive
    async fn up(&self, progress: &mut (dyn Write + Send)) -> Result<UpdateResult, EngineError>;

    /// Destroy every resource in the stack
    async fn destroy(&self) -> Result<UpdateResult, EngineError>;
}
