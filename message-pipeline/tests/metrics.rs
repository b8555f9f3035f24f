mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use common::harness;
use message_pipeline::metrics_routes::setup_metrics_routes;
use message_pipeline::router::router;
use serde_json::json;
use tower::ServiceExt;

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

// Installs the process-wide recorder, so this binary holds exactly one test.
#[tokio::test]
async fn metrics_route_exposes_request_and_pipeline_metrics() {
    let h = harness();
    h.broker.seed(
        "versions",
        [json!({"key": "A", "version": 1, "value": 1}).to_string()],
    );
    let app = setup_metrics_routes(router(Arc::new(h.pipeline))).unwrap();

    assert_eq!(get(&app, "/").await.0, StatusCode::OK);

    let transform = Request::builder()
        .method("POST")
        .uri("/transformMessages")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"readQueue": "versions", "writeQueue": "merged", "messageCount": 1})
                .to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(transform).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"http_requests_total{method="GET",path="/",status="200"} 1"#));
    assert!(body
        .lines()
        .any(|line| line.starts_with("http_requests_duration_seconds_bucket{")
            && line.contains(r#"path="/transformMessages""#)));
    assert!(body.contains(r#"pipeline_records_read{source="versions"} 1"#));
    assert!(body.contains(r#"pipeline_cache_updates{op="set"} 1"#));
}
