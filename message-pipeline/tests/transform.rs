mod common;

use std::time::Duration;

use common::{harness, harness_with, published};
use common_blob::MockBlobStore;
use common_redis::{CustomRedisError, MockRedisClient};
use message_pipeline::error::PipelineError;
use message_pipeline::transform::TransformRequest;
use serde_json::{json, Value};

fn request(message_count: Option<usize>, timeout_ms: Option<u64>) -> TransformRequest {
    TransformRequest {
        read_queue: "versions".to_string(),
        write_queue: "merged".to_string(),
        message_count,
        timeout_ms,
    }
}

#[tokio::test]
async fn merges_versions_and_emits_trailer_per_tombstone() {
    let h = harness();
    h.broker.seed(
        "versions",
        [
            json!({"key": "A", "version": 1, "value": 10}).to_string(),
            json!({"key": "A", "version": 2, "value": 5}).to_string(),
            json!({"key": "A"}).to_string(),
        ],
    );

    let outcome = h.pipeline.transform(&request(Some(3), None)).await.unwrap();

    assert_eq!(outcome.read, 3);
    assert_eq!(outcome.trailers, 1);
    assert_eq!(
        published(&h.broker, "merged"),
        vec![
            json!({"key": "A", "version": 1, "value": 20.5}),
            json!({"key": "A", "version": 2, "value": 15.5}),
            json!({
                "totalMessagesWritten": 2,
                "totalMessagesProcessed": 3,
                "totalRedisUpdates": 3,
                "totalValueWritten": 36.0,
                "totalAdded": 21.0
            }),
        ]
    );
    assert_eq!(h.redis.value("A"), None);
}

#[tokio::test]
async fn keyless_records_do_not_count_toward_the_batch() {
    let h = harness();
    h.broker.seed(
        "versions",
        [
            json!({"version": 1, "value": 1}).to_string(),
            json!({"key": "A", "version": 1, "value": 1}).to_string(),
            json!({"key": "B", "version": 1, "value": 1}).to_string(),
        ],
    );

    let outcome = h.pipeline.transform(&request(Some(2), None)).await.unwrap();

    assert_eq!(outcome.read, 2);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(outcome.summary.total_messages_processed, 2);
    assert_eq!(
        published(&h.broker, "merged"),
        vec![
            json!({"key": "A", "version": 1, "value": 11.5}),
            json!({"key": "B", "version": 1, "value": 11.5}),
        ]
    );
}

#[tokio::test]
async fn loosely_typed_records_are_merged_not_dropped() {
    let h = harness();
    h.broker.seed(
        "versions",
        [
            json!({"key": 7, "version": "2", "value": "1.5"}).to_string(),
            json!({"key": 7, "TOTAL": "4"}).to_string(),
        ],
    );

    let outcome = h.pipeline.transform(&request(Some(2), None)).await.unwrap();

    assert_eq!(outcome.read, 2);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(outcome.trailers, 1);
    let merged = published(&h.broker, "merged");
    assert_eq!(merged[0], json!({"key": "7", "version": 2, "value": 12.0}));
    assert_eq!(merged[1]["totalMessagesProcessed"], json!(2));
    assert_eq!(h.redis.value("7"), None);
}

#[tokio::test]
async fn trailer_counters_never_decrease() {
    let h = harness();
    h.broker.seed(
        "versions",
        [
            json!({"key": "A", "version": 1, "value": 1}).to_string(),
            json!({"key": "A", "TOTAL": 2}).to_string(),
            json!({"key": "B", "version": 3, "value": 4}).to_string(),
            json!({"key": "B", "version": 2, "value": 4}).to_string(),
            json!({"key": "C"}).to_string(),
        ],
    );

    let outcome = h.pipeline.transform(&request(Some(5), None)).await.unwrap();
    assert_eq!(outcome.trailers, 2);

    let trailers: Vec<Value> = published(&h.broker, "merged")
        .into_iter()
        .filter(|record| record.get("totalMessagesProcessed").is_some())
        .collect();
    assert_eq!(trailers.len(), 2);

    for field in [
        "totalMessagesWritten",
        "totalMessagesProcessed",
        "totalRedisUpdates",
        "totalValueWritten",
        "totalAdded",
    ] {
        let first = trailers[0][field].as_f64().unwrap();
        let second = trailers[1][field].as_f64().unwrap();
        assert!(first >= 0.0, "{field} is negative");
        assert!(second >= first, "{field} decreased");
    }
}

#[tokio::test]
async fn previous_cache_state_decides_the_bonus() {
    let cached = json!({"key": "A", "version": 5, "value": 1.0}).to_string();
    let redis = MockRedisClient::new().with_value("A", &cached);
    let h = harness_with(redis, MockBlobStore::new());
    h.broker.seed(
        "versions",
        [json!({"key": "A", "version": 4, "value": 2}).to_string()],
    );

    let outcome = h.pipeline.transform(&request(Some(1), None)).await.unwrap();

    assert_eq!(outcome.summary.total_redis_updates, 0);
    assert_eq!(
        published(&h.broker, "merged"),
        vec![json!({"key": "A", "version": 4, "value": 2.0})]
    );
    assert!(h.redis.calls_for("set").is_empty());
}

#[tokio::test]
async fn configured_default_timeout_bounds_unbounded_requests() {
    let h = harness();
    let pipeline = h
        .pipeline
        .with_default_timeout(Some(Duration::from_millis(30)));
    h.broker.seed(
        "versions",
        [json!({"key": "A", "version": 1, "value": 1}).to_string()],
    );

    let outcome = pipeline.transform(&request(None, None)).await.unwrap();

    assert_eq!(outcome.read, 1);
    assert_eq!(published(&h.broker, "merged").len(), 1);
}

#[tokio::test]
async fn cache_failure_fails_the_request() {
    let redis = MockRedisClient::new().get_err("A", CustomRedisError::Timeout);
    let h = harness_with(redis, MockBlobStore::new());
    h.broker.seed(
        "versions",
        [json!({"key": "A", "version": 1, "value": 1}).to_string()],
    );

    let err = h
        .pipeline
        .transform(&request(Some(1), None))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Cache(_)));
    assert!(!err.is_configuration());
}
