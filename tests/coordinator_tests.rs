mod common;

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use common::{
    GRACE, eventually, fast_policy, health_server, pid_alive, refused_url, setup_root, shell_service,
    sleeper,
};
use herd::error::{LaunchError, ProbeError, StartupCause, StartupStage};
use herd::registry::Registry;
use herd::supervisor::lifecycle::teardown;
use herd::supervisor::{ServiceState, Supervisor, TerminationOutcome};
use tokio_util::sync::CancellationToken;

fn supervisor(cancel: CancellationToken) -> Supervisor {
    Supervisor::with_policy(fast_policy(), GRACE, cancel).unwrap()
}

// ============================================================
// All-healthy startup
// ============================================================

#[tokio::test]
async fn test_all_healthy_returns_ready_in_declaration_order() {
    let root = setup_root();
    let registry = Registry::new(vec![
        sleeper("chatbot", root.path(), health_server(StatusCode::OK).await),
        sleeper("backend", root.path(), health_server(StatusCode::OK).await),
    ])
    .unwrap();

    let ready = supervisor(CancellationToken::new())
        .start_all(&registry)
        .await
        .unwrap();

    let names: Vec<_> = ready.services().iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["chatbot", "backend"]);
    assert!(ready.services().iter().all(|s| s.state() == ServiceState::Healthy));

    let mut services = ready.into_services();
    let report = teardown(&mut services, GRACE).await;
    assert!(report.is_clean());
    assert!(services.is_empty());
}

// ============================================================
// Launch failures roll back
// ============================================================

#[tokio::test]
async fn test_launch_failure_stops_already_started_services() {
    let root = setup_root();
    let registry = Registry::new(vec![
        sleeper("chatbot", root.path(), health_server(StatusCode::OK).await),
        sleeper("backend", &root.path().join("missing"), refused_url().await),
    ])
    .unwrap();

    let failure = supervisor(CancellationToken::new())
        .start_all(&registry)
        .await
        .unwrap_err();

    assert_eq!(failure.stage, StartupStage::Launch);
    assert_eq!(failure.service, "backend");
    assert!(matches!(
        failure.cause,
        StartupCause::Launch(LaunchError::MissingDirectory { .. })
    ));
    assert_eq!(failure.teardown.stopped_names(), vec!["chatbot"]);

    let chatbot = &failure.teardown.stopped[0];
    assert_eq!(chatbot.previous_state, ServiceState::Starting);
    assert_eq!(chatbot.outcome, TerminationOutcome::Graceful);
    assert!(!pid_alive(chatbot.pid));
}

#[tokio::test]
async fn test_services_after_failed_launch_are_never_started() {
    let root = setup_root();
    let marker = root.path().join("third-started");
    let registry = Registry::new(vec![
        sleeper("first", root.path(), health_server(StatusCode::OK).await),
        sleeper("second", &root.path().join("missing"), refused_url().await),
        shell_service(
            "third",
            root.path(),
            health_server(StatusCode::OK).await,
            "touch third-started; sleep 30",
        ),
    ])
    .unwrap();

    let failure = supervisor(CancellationToken::new())
        .start_all(&registry)
        .await
        .unwrap_err();

    assert_eq!(failure.service, "second");
    assert_eq!(failure.teardown.stopped_names(), vec!["first"]);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!marker.exists(), "third service must not be launched");
}

// ============================================================
// Probe failures roll back everything
// ============================================================

#[tokio::test]
async fn test_probe_timeout_stops_every_service_in_reverse_order() {
    let root = setup_root();
    let registry = Registry::new(vec![
        sleeper("chatbot", root.path(), health_server(StatusCode::OK).await),
        sleeper("backend", root.path(), refused_url().await).with_timeout(Duration::from_secs(1)),
    ])
    .unwrap();

    let failure = supervisor(CancellationToken::new())
        .start_all(&registry)
        .await
        .unwrap_err();

    assert_eq!(failure.stage, StartupStage::Health);
    assert_eq!(failure.service, "backend");
    assert!(matches!(
        failure.cause,
        StartupCause::Probe(ProbeError::HealthTimeout { .. })
    ));

    let report = &failure.teardown;
    assert_eq!(report.stopped_names(), vec!["backend", "chatbot"]);
    assert_eq!(report.stopped[0].previous_state, ServiceState::Failed);
    assert_eq!(report.stopped[1].previous_state, ServiceState::Healthy);
    for stopped in &report.stopped {
        assert!(!pid_alive(stopped.pid), "{} still running", stopped.name);
    }
}

#[tokio::test]
async fn test_premature_exit_is_a_health_failure_with_recent_output() {
    let root = setup_root();
    let registry = Registry::new(vec![
        sleeper("chatbot", root.path(), health_server(StatusCode::OK).await),
        shell_service(
            "backend",
            root.path(),
            refused_url().await,
            "echo boom; sleep 0.3; exit 2",
        ),
    ])
    .unwrap();

    let failure = supervisor(CancellationToken::new())
        .start_all(&registry)
        .await
        .unwrap_err();

    assert_eq!(failure.stage, StartupStage::Health);
    assert!(matches!(
        failure.cause,
        StartupCause::Probe(ProbeError::PrematureExit { .. })
    ));
    assert!(failure.recent_output.contains(&"boom".to_string()));

    let report = &failure.teardown;
    assert_eq!(report.stopped_names(), vec!["backend", "chatbot"]);
    assert_eq!(report.stopped[0].outcome, TerminationOutcome::AlreadyExited);
}

#[tokio::test]
async fn test_premature_exit_rollback_kills_orphaned_children() {
    let root = setup_root();
    let registry = Registry::new(vec![
        sleeper("chatbot", root.path(), health_server(StatusCode::OK).await),
        shell_service(
            "backend",
            root.path(),
            refused_url().await,
            "sleep 30 & echo $!; sleep 0.3; exit 2",
        ),
    ])
    .unwrap();

    let failure = supervisor(CancellationToken::new())
        .start_all(&registry)
        .await
        .unwrap_err();

    assert!(matches!(
        failure.cause,
        StartupCause::Probe(ProbeError::PrematureExit { .. })
    ));
    let grandchild: u32 = failure.recent_output[0].trim().parse().unwrap();
    assert!(
        eventually(Duration::from_secs(3), || !pid_alive(grandchild)).await,
        "backend's child {grandchild} survived rollback"
    );
    assert!(failure.teardown.stopped.iter().all(|s| !pid_alive(s.pid)));
}

// ============================================================
// Interrupts during startup
// ============================================================

#[tokio::test]
async fn test_interrupt_while_probing_tears_down() {
    let root = setup_root();
    let registry = Registry::new(vec![
        sleeper("chatbot", root.path(), health_server(StatusCode::OK).await),
        sleeper(
            "backend",
            root.path(),
            health_server(StatusCode::SERVICE_UNAVAILABLE).await,
        )
        .with_timeout(Duration::from_secs(30)),
    ])
    .unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let failure = supervisor(cancel).start_all(&registry).await.unwrap_err();

    assert_eq!(failure.stage, StartupStage::Interrupted);
    assert_eq!(failure.service, "backend");
    assert_eq!(failure.teardown.stopped_names(), vec!["backend", "chatbot"]);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_cancelled_before_start_launches_nothing() {
    let root = setup_root();
    let marker = root.path().join("started");
    let registry = Registry::new(vec![shell_service(
        "only",
        root.path(),
        health_server(StatusCode::OK).await,
        "touch started; sleep 30",
    )])
    .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let failure = supervisor(cancel).start_all(&registry).await.unwrap_err();

    assert_eq!(failure.stage, StartupStage::Interrupted);
    assert_eq!(failure.service, "only");
    assert!(failure.teardown.stopped.is_empty());
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!marker.exists());
}
