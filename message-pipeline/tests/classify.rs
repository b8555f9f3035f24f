mod common;

use common::{harness, harness_with, published};
use common_blob::{BlobError, BlobStore, MockBlobStore};
use common_redis::MockRedisClient;
use message_pipeline::classify::{ClassTotals, ClassifyRequest};
use message_pipeline::error::PipelineError;
use serde_json::{json, Value};

fn request(message_count: Option<usize>, timeout_ms: Option<u64>) -> ClassifyRequest {
    ClassifyRequest {
        read_topic: "incoming".to_string(),
        write_queue_good: "good".to_string(),
        write_queue_bad: "bad".to_string(),
        message_count,
        timeout_ms,
    }
}

fn message(key: &str, value: f64) -> String {
    json!({"uid": "u1", "key": key, "comment": "c", "value": value}).to_string()
}

#[tokio::test]
async fn classifies_a_batch_into_both_sinks_with_trailers() {
    let h = harness();
    h.broker.seed(
        "incoming",
        [
            message("abc", 1.0),
            message("toolong", 2.0),
            message("abcd", 3.0),
            message("xy", 4.0),
            message("efg", 5.0),
        ],
    );

    let outcome = h.pipeline.classify(&request(Some(5), None)).await.unwrap();

    assert_eq!(outcome.read, 5);
    assert_eq!(outcome.accepted, 3);
    assert_eq!(outcome.rejected, 2);
    assert_eq!(outcome.stored, 3);
    assert_eq!(outcome.totals, ClassTotals { good: 9.0, bad: 6.0 });

    let good = published(&h.broker, "good");
    assert_eq!(good.len(), 4);
    assert_eq!(
        good[0],
        json!({"uid": "u1", "key": "abc", "comment": "c", "value": 1.0, "uuid": "blob-1"})
    );
    assert_eq!(good[3], json!({"TOTAL": 9.0}));

    let bad = published(&h.broker, "bad");
    assert_eq!(
        bad,
        vec![
            json!({"uid": "u1", "key": "toolong", "comment": "c", "value": 2.0}),
            json!({"uid": "u1", "key": "xy", "comment": "c", "value": 4.0}),
            json!({"TOTAL": 6.0}),
        ]
    );
}

#[tokio::test]
async fn loosely_typed_record_is_classified_not_dropped() {
    let h = harness();
    h.broker.seed(
        "incoming",
        [json!({"uid": "u", "key": 1234, "comment": "c", "value": "2"}).to_string()],
    );

    let outcome = h.pipeline.classify(&request(Some(1), None)).await.unwrap();

    assert_eq!(outcome.read, 1);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(outcome.accepted, 1);
    assert_eq!(
        published(&h.broker, "good"),
        vec![
            json!({"uid": "u", "key": "1234", "comment": "c", "value": 2.0, "uuid": "blob-1"}),
            json!({"TOTAL": 2.0}),
        ]
    );
    assert_eq!(published(&h.broker, "bad"), vec![json!({"TOTAL": 0.0})]);
}

#[tokio::test]
async fn stored_blobs_carry_the_running_good_total() {
    let h = harness();
    h.broker
        .seed("incoming", [message("abc", 1.0), message("abcd", 3.0)]);

    h.pipeline.classify(&request(Some(2), None)).await.unwrap();

    let second = h.blobs.get("blob-2").await.unwrap().unwrap();
    let stored: Value = serde_json::from_str(&second.data).unwrap();
    assert_eq!(second.dataset_name, "accepted");
    assert_eq!(stored["runningTotalValue"], json!(4.0));
    assert!(stored.get("uuid").is_none());
}

#[tokio::test]
async fn records_missing_fields_are_filtered_before_counting() {
    let h = harness();
    h.broker.seed(
        "incoming",
        [
            json!({"uid": "u1", "key": "abc"}).to_string(),
            "not json".to_string(),
            message("abc", 1.0),
            message("toolong", 1.0),
        ],
    );

    let outcome = h.pipeline.classify(&request(Some(2), None)).await.unwrap();

    assert_eq!(outcome.read, 2);
    assert_eq!(outcome.accepted + outcome.rejected, 2);
}

#[tokio::test]
async fn storage_failure_publishes_null_uuid() {
    let blobs = MockBlobStore::new()
        .fail_puts_for("accepted", BlobError::UnexpectedStatus { status: 500 });
    let h = harness_with(MockRedisClient::new(), blobs);
    h.broker.seed("incoming", [message("abc", 1.0)]);

    let outcome = h.pipeline.classify(&request(Some(1), None)).await.unwrap();

    assert_eq!(outcome.stored, 0);
    assert_eq!(published(&h.broker, "good")[0]["uuid"], Value::Null);
}

#[tokio::test]
async fn empty_read_still_sends_both_trailers() {
    let h = harness();

    let outcome = h
        .pipeline
        .classify(&request(None, Some(30)))
        .await
        .unwrap();

    assert_eq!(outcome.read, 0);
    assert_eq!(published(&h.broker, "good"), vec![json!({"TOTAL": 0.0})]);
    assert_eq!(published(&h.broker, "bad"), vec![json!({"TOTAL": 0.0})]);
}

#[tokio::test]
async fn unbounded_request_is_a_configuration_error() {
    let h = harness();
    h.broker.seed("incoming", [message("abc", 1.0)]);

    let err = h
        .pipeline
        .classify(&request(None, None))
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(h.broker.subscribe_calls(), 0);
    assert!(h.broker.records("good").is_empty());
}

#[tokio::test]
async fn exhausted_good_write_skips_remaining_writes() {
    let h = harness();
    h.broker
        .seed("incoming", [message("abc", 1.0), message("toolong", 1.0)]);
    h.broker.fail_next_publishes("good", 3);

    let err = h
        .pipeline
        .classify(&request(Some(2), None))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Write(_)));
    assert!(h.broker.records("good").is_empty());
    assert!(h.broker.records("bad").is_empty());
}
