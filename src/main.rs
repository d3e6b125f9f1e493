use aksctl::cli::{Cli, Commands, CreateCommand, CreateResource, DeleteCommand, DeleteResource};
use aksctl::commands::{self, CreateOutcome};
use aksctl::{PulumiCli, Settings};
use anyhow::Context as _;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Log filter: `RUST_LOG` if set, otherwise `debug` or `info`
pub fn env_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }))
}

/// Settings from the config file and environment
///
/// An unreadable config file is reported and skipped; the run carries on
/// with environment values and flags.
fn load_settings() -> Settings {
    match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            warn!(error = %e, "Ignoring config file");
            let mut settings = Settings::default();
            settings.apply_env(|key| std::env::var(key).ok());
            settings
        }
    }
}

fn pulumi_engine(settings: &Settings) -> anyhow::Result<PulumiCli> {
    let workspace_root = settings
        .workspace_root()
        .context("failed to locate engine workspace directory")?;
    Ok(PulumiCli::new(settings.pulumi_binary(), workspace_root))
}

/// Execute one command; settings are loaded only by commands that need them
async fn run<F>(cli: Cli, load: F) -> anyhow::Result<()>
where
    F: FnOnce() -> Settings,
{
    let org = cli.org.as_deref();

    match cli.command {
        Commands::Version => {
            println!("{}", commands::version());
        }
        Commands::Create(CreateCommand {
            resource: CreateResource::Cluster(args),
        }) => {
            let settings = load();
            let engine = pulumi_engine(&settings)?;
            let mut stdout = std::io::stdout();
            match commands::create_cluster(&engine, &settings, org, &args, &mut stdout).await? {
                CreateOutcome::Previewed(preview) => print!("{}", preview.output),
                CreateOutcome::Applied(result) => {
                    info!(lines = result.output_lines, "Update finished");
                }
            }
        }
        Commands::Delete(DeleteCommand {
            resource: DeleteResource::Cluster(args),
        }) => {
            let settings = load();
            let engine = pulumi_engine(&settings)?;
            commands::delete_cluster(&engine, &settings, org, &args).await?;
            println!("Cluster {} deleted from stack {}", args.name, args.stack);
        }
    }

    Ok(())
}

/// One-line report of an error and its causes
fn error_report(error: &anyhow::Error) -> String {
    format!("Error: {:#}", error)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli.debug))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli, load_settings).await {
        eprintln!("{}", error_report(&e));
        std::process::exit(1);
    }
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
