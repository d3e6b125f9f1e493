//! Engine backed by the pulumi CLI
//!
//! Each fully-qualified stack gets its own workspace directory holding a
//! `Pulumi.yaml` project. The resource graph is rendered into that file as
//! a YAML program, so no language host is needed.

use super::{
    Engine, EngineError, PreviewOptions, PreviewResult, Stack, StackRef, UpdateResult,
};
use crate::graph::ResourceGraph;
use crate::plugins::Provider;
use async_trait::async_trait;
use chrono::Utc;
use serde_yaml::{Mapping, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

const PROJECT_FILE: &str = "Pulumi.yaml";
const PROJECT_DESCRIPTION: &str = "AKS cluster managed by aksctl";

/// Engine that shells out to `pulumi`
#[derive(Debug, Clone)]
pub struct PulumiCli {
    binary: PathBuf,
    workspace_root: PathBuf,
}

impl PulumiCli {
    pub fn new(binary: impl Into<PathBuf>, workspace_root: impl Into<PathBuf>) -> Self {
        PulumiCli {
            binary: binary.into(),
            workspace_root: workspace_root.into(),
        }
    }

    /// `<root>/<org>/<project>/<stack>`
    pub fn workspace_dir(&self, stack: &StackRef) -> PathBuf {
        self.workspace_root
            .join(&stack.org)
            .join(&stack.project)
            .join(&stack.stack)
    }

    async fn prepare(
        &self,
        stack: &StackRef,
        program: Option<&ResourceGraph>,
        create: bool,
    ) -> Result<Box<dyn Stack>, EngineError> {
        stack.validate()?;
        let workdir = self.workspace_dir(stack);
        tokio::fs::create_dir_all(&workdir).await?;

        let project = render_project(&stack.project, program)?;
        tokio::fs::write(workdir.join(PROJECT_FILE), project).await?;
        debug!(workspace = %workdir.display(), "Wrote project file");

        let handle = PulumiStack {
            binary: self.binary.clone(),
            workdir,
            stack: stack.clone(),
        };

        let id = stack.to_string();
        let mut args = vec!["stack", "select"];
        if create {
            args.push("--create");
        }
        args.extend(["--stack", id.as_str(), "--non-interactive"]);
        handle.run(&args).await?;

        info!(stack = %stack, "Selected stack");
        Ok(Box::new(handle))
    }
}

#[async_trait]
impl Engine for PulumiCli {
    async fn upsert_stack(
        &self,
        stack: &StackRef,
        program: &ResourceGraph,
    ) -> Result<Box<dyn Stack>, EngineError> {
        self.prepare(stack, Some(program), true).await
    }

    async fn select_stack(&self, stack: &StackRef) -> Result<Box<dyn Stack>, EngineError> {
        self.prepare(stack, None, false).await
    }
}

/// Render a `Pulumi.yaml` project, with the graph as its YAML program
pub fn render_project(
    project: &str,
    program: Option<&ResourceGraph>,
) -> Result<String, EngineError> {
    let mut doc = Mapping::new();
    doc.insert("name".into(), Value::String(project.to_string()));
    doc.insert("runtime".into(), Value::String("yaml".to_string()));
    doc.insert(
        "description".into(),
        Value::String(PROJECT_DESCRIPTION.to_string()),
    );
    if let Some(graph) = program {
        doc.insert(
            "resources".into(),
            Value::Mapping(graph.to_pulumi_resources()),
        );
    }
    Ok(serde_yaml::to_string(&doc)?)
}

struct PulumiStack {
    binary: PathBuf,
    workdir: PathBuf,
    stack: StackRef,
}

impl PulumiStack {
    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .current_dir(&self.workdir)
            .env("PULUMI_SKIP_UPDATE_CHECK", "true")
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }

    fn describe(&self, args: &[&str]) -> String {
        format!("{} {}", display_binary(&self.binary), args.join(" "))
    }

    /// Run to completion, returning captured stdout
    async fn run(&self, args: &[&str]) -> Result<String, EngineError> {
        let description = self.describe(args);
        debug!(command = %description, "Running engine command");

        let output = self
            .command(args)
            .output()
            .await
            .map_err(|source| EngineError::Spawn {
                command: description.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(EngineError::CommandFailed {
                command: description,
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run while forwarding stdout line by line, returning the line count
    async fn stream(
        &self,
        args: &[&str],
        progress: &mut (dyn Write + Send),
    ) -> Result<usize, EngineError> {
        let description = self.describe(args);
        debug!(command = %description, "Streaming engine command");

        let mut child = self
            .command(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                command: description.clone(),
                source,
            })?;

        // Drain stderr concurrently so a full pipe cannot stall the child
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                if let Err(e) = stderr.read_to_end(&mut buf).await {
                    warn!(error = %e, "Failed to read engine stderr");
                }
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        let lines_seen = match child.stdout.take() {
            Some(stdout) => forward_lines(stdout, progress).await,
            None => 0,
        };

        let status = child.wait().await?;
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            return Err(EngineError::CommandFailed {
                command: description,
                code: status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(lines_seen)
    }
}

/// Copy engine output to `progress` line by line, returning the line count
///
/// Output is read to the end even when forwarding fails, so the child never
/// blocks on a full pipe and its exit status stays authoritative.
async fn forward_lines<R>(output: R, progress: &mut (dyn Write + Send)) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(output);
    let mut line = Vec::new();
    let mut lines_seen = 0;
    let mut forwarding = true;

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                lines_seen += 1;
                if !forwarding {
                    continue;
                }
                let text = String::from_utf8_lossy(&line);
                let written = writeln!(progress, "{}", text.trim_end_matches(['\r', '\n']))
                    .and_then(|_| progress.flush());
                if let Err(e) = written {
                    warn!(error = %e, "Stopped forwarding engine progress");
                    forwarding = false;
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to read engine output");
                break;
            }
        }
    }

    lines_seen
}

fn display_binary(binary: &Path) -> String {
    binary
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| binary.display().to_string())
}

#[async_trait]
impl Stack for PulumiStack {
    fn stack_ref(&self) -> &StackRef {
        &self.stack
    }

    async fn install_plugin(&self, provider: Provider) -> Result<(), EngineError> {
        self.run(&[
            "plugin",
            "install",
            "resource",
            provider.name(),
            provider.version(),
        ])
        .await?;
        Ok(())
    }

    async fn preview(&self, options: &PreviewOptions) -> Result<PreviewResult, EngineError> {
        let id = self.stack.to_string();
        let mut args = vec!["preview", "--stack", id.as_str(), "--non-interactive"];
        if let Some(message) = &options.message {
            args.extend(["--message", message.as_str()]);
        }

        let started_at = Utc::now();
        let output = self.run(&args).await?;
        Ok(PreviewResult {
            started_at,
            finished_at: Utc::now(),
            output,
        })
    }

    async fn up(&self, progress: &mut (dyn Write + Send)) -> Result<UpdateResult, EngineError> {
        let id = self.stack.to_string();
        let args = [
            "up",
            "--yes",
            "--skip-preview",
            "--stack",
            id.as_str(),
            "--non-interactive",
        ];

        let started_at = Utc::now();
        let output_lines = self.stream(&args, progress).await?;
        Ok(UpdateResult {
            started_at,
            finished_at: Utc::now(),
            output_lines,
        })
    }

    async fn destroy(&self) -> Result<UpdateResult, EngineError> {
        let id = self.stack.to_string();
        let args = [
            "destroy",
            "--yes",
            "--skip-preview",
            "--stack",
            id.as_str(),
            "--non-interactive",
        ];

        let started_at = Utc::now();
        let output = self.run(&args).await?;
        Ok(UpdateResult {
            started_at,
            finished_at: Utc::now(),
            output_lines: output.lines().count(),
        })
    }
}

#[cfg(test)]
#[path = "pulumi_test.rs"]
mod tests;
