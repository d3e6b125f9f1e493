//! Command line surface
//!
//! ```text
//! aksctl [--org <org>] [--debug] create cluster --name <n> --project <p> --stack <s> [...]
//! aksctl [--org <org>] [--debug] delete cluster --name <n> --project <p> --stack <s>
//! aksctl version
//! ```

use crate::graph::cluster::{DEFAULT_KUBERNETES_VERSION, DEFAULT_REGION};
use clap::{Args, Parser, Subcommand};

/// Create AKS clusters with ease
#[derive(Parser, Debug)]
#[command(name = "aksctl", version, about, long_about = None)]
pub struct Cli {
    /// Pulumi org to use for your stack
    #[arg(short = 'o', long, global = true)]
    pub org: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create resources
    Create(CreateCommand),

    /// Delete resources
    Delete(DeleteCommand),

    /// Print the aksctl version
    Version,
}

#[derive(Args, Debug)]
pub struct CreateCommand {
    #[command(subcommand)]
    pub resource: CreateResource,
}

#[derive(Subcommand, Debug)]
pub enum CreateResource {
    /// Create an AKS cluster
    Cluster(CreateClusterArgs),
}

#[derive(Args, Debug)]
pub struct DeleteCommand {
    #[command(subcommand)]
    pub resource: DeleteResource,
}

#[derive(Subcommand, Debug)]
pub enum DeleteResource {
    /// Delete an AKS cluster
    Cluster(DeleteClusterArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CreateClusterArgs {
    /// Name to give to your cluster
    #[arg(short = 'n', long)]
    pub name: String,

    /// Pulumi project to use
    #[arg(short = 'p', long)]
    pub project: String,

    /// Pulumi stack to create or use
    #[arg(short = 's', long)]
    pub stack: String,

    /// Azure region to deploy the resource group to
    #[arg(short = 'r', long, default_value = DEFAULT_REGION)]
    pub region: String,

    /// Preview changes, dry-run mode
    #[arg(short = 'd', long = "dry-run")]
    pub dry_run: bool,

    /// AKS version to deploy
    #[arg(long = "cluster-version", default_value = DEFAULT_KUBERNETES_VERSION)]
    pub cluster_version: String,

    /// Location of the managed cluster (defaults to WestUS regardless of --region)
    #[arg(long = "cluster-location")]
    pub cluster_location: Option<String>,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct DeleteClusterArgs {
    /// Name of the cluster to delete
    #[arg(short = 'n', long)]
    pub name: String,

    /// Pulumi project the cluster was created in
    #[arg(short = 'p', long)]
    pub project: String,

    /// Pulumi stack holding the cluster
    #[arg(short = 's', long)]
    pub stack: String,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
