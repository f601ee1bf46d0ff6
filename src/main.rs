use std::sync::Arc;

use munch::config::AppConfig;
use munch::identity::IdTokenVerifier;
use munch::identity::toolkit::ToolkitClient;
use munch::routes;
use munch::state::AppState;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env().expect("invalid configuration");
    let port = config.port;

    let verifier: Option<Arc<dyn IdTokenVerifier>> = match &config.toolkit {
        Some(toolkit) => {
            let client = ToolkitClient::new(toolkit.clone()).expect("identity toolkit client init failed");
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!("FIREBASE_API_KEY not set; session tokens will not be verified");
            None
        }
    };

    let app = routes::app(AppState::new(config, verifier));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "munch listening");
    axum::serve(listener, app).await.expect("server failed");
}
