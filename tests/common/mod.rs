#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use herd::registry::ServiceSpec;
use herd::supervisor::ProbePolicy;
use reqwest::Url;
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const GRACE: Duration = Duration::from_secs(2);

pub fn setup_root() -> TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}

pub fn fast_policy() -> ProbePolicy {
    ProbePolicy {
        interval: Duration::from_millis(100),
        attempt_timeout: Duration::from_secs(1),
    }
}

fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

/// A long-running service whose health is served elsewhere.
pub fn sleeper(name: &str, dir: &Path, url: Url) -> ServiceSpec {
    ServiceSpec::new(name, vec!["sleep".to_string(), "30".to_string()], dir, url)
        .with_timeout(Duration::from_secs(5))
}

pub fn shell_service(name: &str, dir: &Path, url: Url, script: &str) -> ServiceSpec {
    ServiceSpec::new(name, sh(script), dir, url).with_timeout(Duration::from_secs(5))
}

async fn serve(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/health")).unwrap()
}

/// `/health` endpoint that always answers `status`.
pub async fn health_server(status: StatusCode) -> Url {
    serve(Router::new().route("/health", get(move || async move { status }))).await
}

/// `/health` endpoint that answers 503 until the `healthy_on`-th request.
pub async fn flaky_health_server(healthy_on: usize) -> (Url, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        "/health",
        get(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) + 1 >= healthy_on {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            }
        }),
    );
    (serve(app).await, hits)
}

/// Accepts connections and never answers.
pub async fn hanging_server() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    Url::parse(&format!("http://{addr}/health")).unwrap()
}

/// URL on a port nothing listens on (connection refused).
pub async fn refused_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}/health")).unwrap()
}

/// True if `pid` exists and is not a zombie (Linux `/proc`).
pub fn pid_alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit(')')
            .next()
            .map(|rest| !rest.trim_start().starts_with('Z'))
            .unwrap_or(false),
        Err(_) => false,
    }
}

/// Poll `condition` every 20ms until it holds or `within` elapses.
pub async fn eventually(within: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < within {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
