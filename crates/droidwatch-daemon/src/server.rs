//! Web server setup and routing

use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api;
use crate::check::{Checker, Sources};

/// Build the router serving check results
pub fn router<S: Sources>(checker: Arc<Checker<S>>) -> Router {
    Router::new()
        .route("/", get(api::get_check::<S>).head(api::head_check))
        .fallback(api::not_found)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(checker)
}

/// Serve check results over plain HTTP until the process is stopped
pub async fn run<S: Sources>(checker: Arc<Checker<S>>, host: &str, port: u16) -> Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!(
        address = %listener.local_addr()?,
        protocol = "HTTP",
        cache_timeout = ?checker.cache_timeout(),
        "Starting web server"
    );

    axum::serve(listener, router(checker))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::tests::FakeSources;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(devices: &str) -> (Router, Arc<std::sync::atomic::AtomicUsize>) {
        let sources = FakeSources::new(devices);
        let runs = sources.runs.clone();
        let checker = Arc::new(Checker::new(sources, Duration::from_secs(5)));
        (router(checker), runs)
    }

    async fn send(app: Router, method: Method, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, body.to_vec())
    }

    #[tokio::test]
    async fn test_get_root() {
        let (app, _) = app("List of devices attached\n");
        let (status, content_type, body) = send(app, Method::GET, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["missing"][0]["adb"], "ABC123");
        assert_eq!(json["usb"]["ABC123"]["description"], "Google Inc. Nexus");
        assert_eq!(json["adb"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_head_root() {
        let (app, runs) = app("List of devices attached\n");
        let (status, content_type, body) = send(app, Method::HEAD, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert!(body.is_empty());
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let (app, _) = app("List of devices attached\n");
        let (status, _, body) = send(app, Method::GET, "/status").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_failed_check_is_500() {
        let mut sources = FakeSources::new("List of devices attached\n");
        sources.dump = sources.dump.replace("0x18d1", "18d1");
        let app = router(Arc::new(Checker::new(sources, Duration::from_secs(5))));

        let (status, _, body) = send(app, Method::GET, "/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("Malformed USB topology"));
    }

    #[tokio::test]
    async fn test_burst_served_from_cache() {
        let (app, runs) = app("List of devices attached\nABC123\tdevice\n");

        for _ in 0..3 {
            let (status, _, _) = send(app.clone(), Method::GET, "/").await;
            assert_eq!(status, StatusCode::OK);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
