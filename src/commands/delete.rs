//! `delete cluster`

use super::CommandError;
use crate::cli::DeleteClusterArgs;
use crate::config::Settings;
use crate::engine::{Engine, StackRef, UpdateResult};
use tracing::info;

/// Destroy every resource in the cluster's stack
///
/// Plugins are not reinstalled; the workspace keeps those from the create.
pub async fn delete_cluster(
    engine: &dyn Engine,
    settings: &Settings,
    org_flag: Option<&str>,
    args: &DeleteClusterArgs,
) -> Result<UpdateResult, CommandError> {
    let org = settings.resolve_org(org_flag)?;
    let stack_ref = StackRef::new(org, &args.project, &args.stack);
    stack_ref.validate()?;

    let stack = engine
        .select_stack(&stack_ref)
        .await
        .map_err(|source| CommandError::StackInit {
            stack: stack_ref.to_string(),
            source,
        })?;

    let result = stack
        .destroy()
        .await
        .map_err(|source| CommandError::StackDestroy {
            stack: stack_ref.to_string(),
            source,
        })?;

    info!(
        stack = %stack_ref,
        cluster = %args.name,
        elapsed_secs = result.elapsed().num_seconds(),
        "Cluster deleted"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::{EngineCall, FailOn, RecordingEngine};

    fn args() -> DeleteClusterArgs {
        DeleteClusterArgs {
            name: "demo".to_string(),
            project: "infra".to_string(),
            stack: "dev".to_string(),
        }
    }

    fn settings() -> Settings {
        Settings {
            org: Some("acme".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_delete_selects_and_destroys() {
        let engine = RecordingEngine::new();

        delete_cluster(&engine, &settings(), None, &args())
            .await
            .unwrap();

        assert_eq!(
            engine.calls(),
            vec![
                EngineCall::SelectStack("acme/infra/dev".to_string()),
                EngineCall::Destroy,
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_requires_org() {
        let engine = RecordingEngine::new();

        let err = delete_cluster(&engine, &Settings::default(), None, &args())
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::MissingConfiguration));
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_never_installs_plugins() {
        let engine = RecordingEngine::new();

        delete_cluster(&engine, &settings(), Some("other"), &args())
            .await
            .unwrap();

        assert!(!engine
            .calls()
            .iter()
            .any(|c| matches!(c, EngineCall::InstallPlugin(_))));
        assert_eq!(
            engine.calls().first(),
            Some(&EngineCall::SelectStack("other/infra/dev".to_string()))
        );
    }

    #[tokio::test]
    async fn test_destroy_failure() {
        let engine = RecordingEngine::failing_on(FailOn::Destroy);

        let err = delete_cluster(&engine, &settings(), None, &args())
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::StackDestroy { .. }));
        assert_eq!(err.to_string(), "error destroying stack acme/infra/dev");
    }

    #[tokio::test]
    async fn test_path_like_stack_is_rejected_before_engine() {
        let engine = RecordingEngine::new();
        let mut args = args();
        args.stack = "../../etc".to_string();

        let err = delete_cluster(&engine, &settings(), None, &args)
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::InvalidStack(_)));
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_select_failure_is_stack_init() {
        let engine = RecordingEngine::failing_on(FailOn::Select);

        let err = delete_cluster(&engine, &settings(), None, &args())
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::StackInit { .. }));
        assert_eq!(engine.calls().len(), 1);
    }
}
