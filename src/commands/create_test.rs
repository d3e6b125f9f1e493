use super::*;
use crate::engine::mock::{EngineCall, FailOn, RecordingEngine};

fn args(dry_run: bool) -> CreateClusterArgs {
    CreateClusterArgs {
        name: "demo".to_string(),
        project: "infra".to_string(),
        stack: "dev".to_string(),
        region: "westus".to_string(),
        dry_run,
        cluster_version: "1.19.0".to_string(),
        cluster_location: None,
    }
}

fn settings_with_org(org: &str) -> Settings {
    Settings {
        org: Some(org.to_string()),
        ..Default::default()
    }
}

fn plugin_calls() -> Vec<EngineCall> {
    Provider::ALL
        .iter()
        .map(|p| EngineCall::InstallPlugin(*p))
        .collect()
}

#[tokio::test]
async fn test_missing_org_fails_before_engine_is_called() {
    let engine = RecordingEngine::new();
    let mut progress = Vec::new();

    let err = create_cluster(&engine, &Settings::default(), Some(""), &args(false), &mut progress)
        .await
        .unwrap_err();

    assert!(matches!(err, CommandError::MissingConfiguration));
    assert!(engine.calls().is_empty());
    assert!(progress.is_empty());
}

#[tokio::test]
async fn test_dry_run_previews_and_never_applies() {
    let engine = RecordingEngine::new();
    let mut progress = Vec::new();

    let outcome = create_cluster(
        &engine,
        &settings_with_org("acme"),
        None,
        &args(true),
        &mut progress,
    )
    .await
    .unwrap();

    assert!(matches!(outcome, CreateOutcome::Previewed(_)));
    let mut expected = vec![EngineCall::UpsertStack {
        stack: "acme/infra/dev".to_string(),
        resources: 7,
    }];
    expected.extend(plugin_calls());
    expected.push(EngineCall::Preview(Some(DRY_RUN_MESSAGE.to_string())));
    assert_eq!(engine.calls(), expected);
    assert!(progress.is_empty());
}

#[tokio::test]
async fn test_apply_runs_exactly_once_without_preview() {
    let engine = RecordingEngine::new();
    let mut progress = Vec::new();

    let outcome = create_cluster(
        &engine,
        &settings_with_org("acme"),
        None,
        &args(false),
        &mut progress,
    )
    .await
    .unwrap();

    assert!(matches!(outcome, CreateOutcome::Applied(_)));
    let calls = engine.calls();
    assert_eq!(calls.iter().filter(|c| **c == EngineCall::Up).count(), 1);
    assert!(!calls.iter().any(|c| matches!(c, EngineCall::Preview(_))));
    assert_eq!(calls.last(), Some(&EngineCall::Up));
    assert_eq!(
        String::from_utf8(progress).unwrap(),
        "Updating (acme/infra/dev)\nResources: 7 created\n"
    );
}

#[tokio::test]
async fn test_plugins_installed_before_apply() {
    let engine = RecordingEngine::new();
    let mut progress = Vec::new();

    create_cluster(
        &engine,
        &settings_with_org("acme"),
        None,
        &args(false),
        &mut progress,
    )
    .await
    .unwrap();

    let calls = engine.calls();
    assert_eq!(&calls[1..5], plugin_calls().as_slice());
}

#[tokio::test]
async fn test_plugin_failure_stops_further_installs() {
    let engine = RecordingEngine::failing_on(FailOn::Plugin(Provider::AzureAd));
    let mut progress = Vec::new();

    let err = create_cluster(
        &engine,
        &settings_with_org("acme"),
        None,
        &args(false),
        &mut progress,
    )
    .await
    .unwrap_err();

    match err {
        CommandError::PluginInstall { plugin, .. } => assert_eq!(plugin, Provider::AzureAd),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        engine.calls(),
        vec![
            EngineCall::UpsertStack {
                stack: "acme/infra/dev".to_string(),
                resources: 7,
            },
            EngineCall::InstallPlugin(Provider::AzureNextgen),
            EngineCall::InstallPlugin(Provider::AzureAd),
        ]
    );
}

#[tokio::test]
async fn test_flag_org_overrides_settings() {
    let engine = RecordingEngine::new();
    let mut progress = Vec::new();

    create_cluster(
        &engine,
        &settings_with_org("from-file"),
        Some("acme"),
        &args(true),
        &mut progress,
    )
    .await
    .unwrap();

    assert!(matches!(
        engine.calls().first(),
        Some(EngineCall::UpsertStack { stack, .. }) if stack == "acme/infra/dev"
    ));
}

#[tokio::test]
async fn test_stack_init_failure() {
    let engine = RecordingEngine::failing_on(FailOn::Upsert);
    let mut progress = Vec::new();

    let err = create_cluster(
        &engine,
        &settings_with_org("acme"),
        None,
        &args(false),
        &mut progress,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CommandError::StackInit { ref stack, .. } if stack == "acme/infra/dev"));
    assert_eq!(engine.calls().len(), 1);
}

#[tokio::test]
async fn test_preview_failure() {
    let engine = RecordingEngine::failing_on(FailOn::Preview);
    let mut progress = Vec::new();

    let err = create_cluster(
        &engine,
        &settings_with_org("acme"),
        None,
        &args(true),
        &mut progress,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CommandError::Preview { .. }));
    assert!(!engine.calls().contains(&EngineCall::Up));
}

#[tokio::test]
async fn test_apply_failure_is_returned() {
    let engine = RecordingEngine::failing_on(FailOn::Up);
    let mut progress = Vec::new();

    let err = create_cluster(
        &engine,
        &settings_with_org("acme"),
        None,
        &args(false),
        &mut progress,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CommandError::Apply { .. }));
    assert_eq!(err.to_string(), "error updating stack acme/infra/dev");
    // Progress reported before the failure still reaches the caller
    assert_eq!(
        String::from_utf8(progress).unwrap(),
        "Updating (acme/infra/dev)\n"
    );
}

#[tokio::test]
async fn test_invalid_graph_never_reaches_engine() {
    let engine = RecordingEngine::new();
    let mut progress = Vec::new();
    let mut invalid = args(false);
    invalid.cluster_version = String::new();

    let err = create_cluster(
        &engine,
        &settings_with_org("acme"),
        None,
        &invalid,
        &mut progress,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CommandError::Registration(_)));
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn test_unusable_stack_reference_never_reaches_engine() {
    let engine = RecordingEngine::new();
    let mut progress = Vec::new();

    for (project, stack) in [("", "dev"), ("/etc", "dev"), ("infra", "..")] {
        let mut invalid = args(false);
        invalid.project = project.to_string();
        invalid.stack = stack.to_string();

        let err = create_cluster(
            &engine,
            &settings_with_org("acme"),
            None,
            &invalid,
            &mut progress,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CommandError::InvalidStack(_)));
    }
    assert!(engine.calls().is_empty());
}

#[test]
fn test_cluster_spec_from_args() {
    let spec = args(false).cluster_spec();

    assert_eq!(spec.name, "demo");
    assert_eq!(spec.stack, "dev");
    assert_eq!(spec.region, "westus");
    assert_eq!(spec.kubernetes_version, "1.19.0");
    assert_eq!(spec.cluster_location, "WestUS");
    assert_eq!(spec.dns_prefix(), "demo-dev-kube");
}

#[test]
fn test_cluster_location_flag_is_used() {
    let mut with_location = args(false);
    with_location.cluster_location = Some("eastus".to_string());

    assert_eq!(with_location.cluster_spec().cluster_location, "eastus");
}
