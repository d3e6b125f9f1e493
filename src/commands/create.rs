//! `create cluster`

use super::CommandError;
use crate::cli::CreateClusterArgs;
use crate::config::Settings;
use crate::engine::{Engine, PreviewOptions, PreviewResult, StackRef, UpdateResult};
use crate::graph::cluster::{build_cluster_graph, ClusterSpec, DEFAULT_CLUSTER_LOCATION};
use crate::plugins::Provider;
use std::io::Write;
use tracing::{debug, info};

/// Message attached to dry-run previews
pub const DRY_RUN_MESSAGE: &str = "Running aksctl dryrun";

/// What a successful `create cluster` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Previewed(PreviewResult),
    Applied(UpdateResult),
}

impl CreateClusterArgs {
    /// Graph inputs for these flags
    pub fn cluster_spec(&self) -> ClusterSpec {
        ClusterSpec {
            name: self.name.clone(),
            region: self.region.clone(),
            stack: self.stack.clone(),
            kubernetes_version: self.cluster_version.clone(),
            cluster_location: self
                .cluster_location
                .clone()
                .unwrap_or_else(|| DEFAULT_CLUSTER_LOCATION.to_string()),
        }
    }
}

/// Provision the cluster described by `args`
///
/// Steps, each aborting the run on failure:
/// 1. Resolve the organization and check the stack reference
/// 2. Build the resource graph
/// 3. Create or select `org/project/stack` with the graph as its program
/// 4. Install every pinned provider plugin
/// 5. Preview (dry run) or apply, streaming apply progress to `progress`
pub async fn create_cluster(
    engine: &dyn Engine,
    settings: &Settings,
    org_flag: Option<&str>,
    args: &CreateClusterArgs,
    progress: &mut (dyn Write + Send),
) -> Result<CreateOutcome, CommandError> {
    let org = settings.resolve_org(org_flag)?;
    let stack_ref = StackRef::new(org, &args.project, &args.stack);
    stack_ref.validate()?;

    let spec = args.cluster_spec();
    let program = build_cluster_graph(&spec)?;
    debug!(
        stack = %stack_ref,
        resources = program.len(),
        region = %spec.region,
        cluster_location = %spec.cluster_location,
        "Built cluster resource graph"
    );

    let stack = engine
        .upsert_stack(&stack_ref, &program)
        .await
        .map_err(|source| CommandError::StackInit {
            stack: stack_ref.to_string(),
            source,
        })?;

    for plugin in Provider::ALL {
        debug!(plugin = plugin.name(), version = plugin.version(), "Installing plugin");
        stack
            .install_plugin(plugin)
            .await
            .map_err(|source| CommandError::PluginInstall { plugin, source })?;
    }
    info!(stack = %stack_ref, "Provider plugins installed");

    if args.dry_run {
        let result = stack
            .preview(&PreviewOptions::with_message(DRY_RUN_MESSAGE))
            .await
            .map_err(|source| CommandError::Preview {
                stack: stack_ref.to_string(),
                source,
            })?;
        info!(stack = %stack_ref, cluster = %args.name, "Dry run complete");
        return Ok(CreateOutcome::Previewed(result));
    }

    let result = stack
        .up(progress)
        .await
        .map_err(|source| CommandError::Apply {
            stack: stack_ref.to_string(),
            source,
        })?;
    info!(
        stack = %stack_ref,
        cluster = %args.name,
        elapsed_secs = result.elapsed().num_seconds(),
        "Cluster created"
    );

    Ok(CreateOutcome::Applied(result))
}

#[cfg(test)]
#[path = "create_test.rs"]
mod tests;
