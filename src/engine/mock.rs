//! Recording engine for unit tests
//!
//! Logs every call in order and fails on request, so tests can assert what
//! reached the engine and in which order.

use super::{
    Engine, EngineError, PreviewOptions, PreviewResult, Stack, StackRef, UpdateResult,
};
use crate::graph::ResourceGraph;
use crate::plugins::Provider;
use async_trait::async_trait;
use chrono::Utc;
use std::io::Write;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    UpsertStack { stack: String, resources: usize },
    SelectStack(String),
    InstallPlugin(Provider),
    Preview(Option<String>),
    Up,
    Destroy,
}

/// Which call should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    Upsert,
    Select,
    Plugin(Provider),
    Preview,
    Up,
    Destroy,
}

#[derive(Clone, Default)]
pub struct RecordingEngine {
    calls: Arc<Mutex<Vec<EngineCall>>>,
    fail_on: Option<FailOn>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(fail_on: FailOn) -> Self {
        RecordingEngine {
            fail_on: Some(fail_on),
            ..Self::default()
        }
    }

    #[allow(clippy::unwrap_used)] // Test helper can use unwrap
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    fn stack(&self, stack: &StackRef) -> RecordingStack {
        RecordingStack {
            stack: stack.clone(),
            calls: self.calls.clone(),
            fail_on: self.fail_on,
        }
    }
}

fn record(calls: &Mutex<Vec<EngineCall>>, call: EngineCall) {
    if let Ok(mut calls) = calls.lock() {
        calls.push(call);
    }
}

fn injected(what: &str) -> EngineError {
    EngineError::CommandFailed {
        command: format!("pulumi {}", what),
        code: 255,
        stderr: format!("injected {} failure", what),
    }
}

#[async_trait]
impl Engine for RecordingEngine {
    async fn upsert_stack(
        &self,
        stack: &StackRef,
        program: &ResourceGraph,
    ) -> Result<Box<dyn Stack>, EngineError> {
        record(
            &self.calls,
            EngineCall::UpsertStack {
                stack: stack.to_string(),
                resources: program.len(),
            },
        );
        if self.fail_on == Some(FailOn::Upsert) {
            return Err(injected("stack select --create"));
        }
        Ok(Box::new(self.stack(stack)))
    }

    async fn select_stack(&self, stack: &StackRef) -> Result<Box<dyn Stack>, EngineError> {
        record(&self.calls, EngineCall::SelectStack(stack.to_string()));
        if self.fail_on == Some(FailOn::Select) {
            return Err(injected("stack select"));
        }
        Ok(Box::new(self.stack(stack)))
    }
}

struct RecordingStack {
    stack: StackRef,
    calls: Arc<Mutex<Vec<EngineCall>>>,
    fail_on: Option<FailOn>,
}

#[async_trait]
impl Stack for RecordingStack {
    fn stack_ref(&self) -> &StackRef {
        &self.stack
    }

    async fn install_plugin(&self, provider: Provider) -> Result<(), EngineError> {
        record(&self.calls, EngineCall::InstallPlugin(provider));
        if self.fail_on == Some(FailOn::Plugin(provider)) {
            return Err(injected("plugin install"));
        }
        Ok(())
    }

    async fn preview(&self, options: &PreviewOptions) -> Result<PreviewResult, EngineError> {
        record(&self.calls, EngineCall::Preview(options.message.clone()));
        if self.fail_on == Some(FailOn::Preview) {
            return Err(injected("preview"));
        }
        let now = Utc::now();
        Ok(PreviewResult {
            started_at: now,
            finished_at: now,
            output: "Resources: 7 to create".to_string(),
        })
    }

    async fn up(&self, progress: &mut (dyn Write + Send)) -> Result<UpdateResult, EngineError> {
        record(&self.calls, EngineCall::Up);
        writeln!(progress, "Updating ({})", self.stack)?;
        if self.fail_on == Some(FailOn::Up) {
            return Err(injected("up"));
        }
        writeln!(progress, "Resources: 7 created")?;
        let now = Utc::now();
        Ok(UpdateResult {
            started_at: now,
            finished_at: now,
            output_lines: 2,
        })
    }

    async fn destroy(&self) -> Result<UpdateResult, EngineError> {
        record(&self.calls, EngineCall::Destroy);
        if self.fail_on == Some(FailOn::Destroy) {
            return Err(injected("destroy"));
        }
        let now = Utc::now();
        Ok(UpdateResult {
            started_at: now,
            finished_at: now,
            output_lines: 1,
        })
    }
}
