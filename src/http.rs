use crate::metrics::Metrics;
use crate::snapshot::SharedSnapshot;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use std::sync::Arc;

/// Local status endpoint. Read-only; it never touches the reporting path.
#[derive(Clone)]
pub struct StatusState {
    pub metrics: Arc<Metrics>,
    pub snapshot: SharedSnapshot,
}

pub fn build_router(metrics: Arc<Metrics>, snapshot: SharedSnapshot) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .route("/api/snapshot", get(snapshot_handler))
        .with_state(StatusState { metrics, snapshot })
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn metrics_handler(State(state): State<StatusState>) -> Response {
    match state.metrics.encode_metrics() {
        Ok(encoded) => {
            let mut response = Response::new(Body::from(encoded));
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            response
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {err}"),
        )
            .into_response(),
    }
}

async fn snapshot_handler(State(state): State<StatusState>) -> impl IntoResponse {
    let current = state.snapshot.read().await.clone();
    Json(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;
    use axum::body::to_bytes;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn healthz_returns_ok() {
        let metrics = Metrics::new().expect("metrics init");
        let app = build_router(metrics, Snapshot::shared());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), b"ok");
    }

    #[tokio::test]
    async fn metrics_lists_sampler_cycles() {
        let metrics = Metrics::new().expect("metrics init");
        metrics.inc_sampler_cycle("memory");
        let app = build_router(metrics, Snapshot::shared());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("varanus_sampler_cycles_total{sampler=\"memory\"} 1"));
    }

    #[tokio::test]
    async fn snapshot_uses_wire_keys() {
        let metrics = Metrics::new().expect("metrics init");
        let snapshot = Snapshot::shared();
        snapshot.write().await.host_name = "box-1".to_string();
        let app = build_router(metrics, snapshot);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/snapshot")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("\"Hostname\":\"box-1\""));
        assert!(text.contains("\"MemTotal\":-1"));
    }
}
