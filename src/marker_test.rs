use super::*;
use crate::config::AppConfig;
use crate::routes::app;
use crate::state::AppState;
use crate::state::test_helpers::MockVerifier;
use std::path::PathBuf;
use std::sync::Arc;

fn public_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("munch-marker-{name}-{}", std::process::id()));
    for (file, body) in [("feed/index.html", "<h1>feed</h1>"), ("landing/index.html", "<h1>landing</h1>")] {
        let path = dir.join(file);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }
    dir
}

/// Serve the full router on an ephemeral port and return its origin.
async fn spawn_app(name: &str, verifier: Option<MockVerifier>) -> String {
    let config = AppConfig { public_dir: public_dir(name), ..AppConfig::default() };
    let verifier = verifier.map(|v| Arc::new(v) as Arc<dyn crate::identity::IdTokenVerifier>);
    let router = app(AppState::new(config, verifier));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn marker(origin: &str) -> HttpSessionMarker {
    HttpSessionMarker::new(origin, Duration::from_secs(5)).unwrap()
}

async fn feed_page(marker: &HttpSessionMarker, origin: &str) -> (String, String) {
    let resp = marker
        .client()
        .get(format!("{origin}/feed/"))
        .send()
        .await
        .unwrap();
    let path = resp.url().path().to_owned();
    (path, resp.text().await.unwrap())
}

#[tokio::test]
async fn issued_cookie_opens_protected_pages() {
    let origin = spawn_app("issue", None).await;
    let marker = marker(&origin);

    let (path, _) = feed_page(&marker, &origin).await;
    assert!(path.starts_with("/landing"), "{path}");

    marker.issue("token-ann").await.unwrap();
    let (path, body) = feed_page(&marker, &origin).await;
    assert_eq!(path, "/feed/");
    assert_eq!(body, "<h1>feed</h1>");
}

#[tokio::test]
async fn cleared_cookie_closes_protected_pages() {
    let origin = spawn_app("clear", None).await;
    let marker = marker(&origin);
    marker.issue("token-ann").await.unwrap();

    marker.clear().await.unwrap();
    let (path, _) = feed_page(&marker, &origin).await;
    assert!(path.starts_with("/landing"), "{path}");
}

#[tokio::test]
async fn rejected_token_reports_status() {
    let verifier = MockVerifier::default().with_token("token-ann", "uid-ann");
    let origin = spawn_app("rejected", Some(verifier)).await;
    let marker = marker(&origin);

    let err = marker.issue("forged").await.unwrap_err();
    assert!(matches!(err, MarkerError::Status(401)), "{err}");
    marker.issue("token-ann").await.unwrap();
}

#[tokio::test]
async fn unreachable_endpoint_reports_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = marker(&format!("http://{addr}")).clear().await.unwrap_err();
    assert!(matches!(err, MarkerError::Transport(_)), "{err}");
}

#[test]
fn endpoint_ignores_trailing_slash_on_origin() {
    let marker = marker("http://localhost:3000/");
    assert_eq!(marker.endpoint, "http://localhost:3000/api/session");
}
