use ingest_api::models::batch::encode_read;
use ingest_api::store::StateStore;
use serde_json::json;

use crate::support::{keys, TestContext};

fn read(id: &str, seq: &str) -> serde_json::Value {
    json!([id, seq, "+", "#".repeat(seq.len())])
}

#[tokio::test]
async fn create_upload_close_single_pair() {
    let t = TestContext::new(100);

    let (status, body) = t.post("/context/create", json!({"filenames": ["a.fq"]})).await;
    assert_eq!(status, 200);
    let session_id = body["context"].as_str().unwrap().to_string();

    let (status, body) = t
        .post(
            &format!("/context/{session_id}/reads"),
            json!([[read("id1", "ACGT")]]),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["processedReads"], 0);
    assert_eq!(body["pendingBytes"], 4);

    // Simulate a filter worker: it saves the read into pair 0 and drains
    // pending_bytes back to zero.
    let parsed_id: ingest_api::models::SessionId = session_id.parse().unwrap();
    t.store
        .set_add(
            &keys::pair_reads(parsed_id, 0),
            encode_read(&["id1".into(), "ACGT".into(), "+".into(), "####".into()]),
        )
        .await
        .unwrap();
    t.store
        .incr_by(&keys::pending_bytes(parsed_id), -4)
        .await
        .unwrap();

    let (status, body) = t.post(&format!("/context/{session_id}/close"), json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["readsSaved"], json!(["id1"]));
    assert_eq!(body["readsProcessed"], 0);

    let contents = tokio::fs::read_to_string(
        t.upload_directory.join(&session_id).join("a.fq"),
    )
    .await
    .unwrap();
    assert_eq!(contents, "id1\nACGT\n+\n####");
}

#[tokio::test]
async fn oversize_read_is_dropped_and_counted() {
    let t = TestContext::new(3);

    let (_, body) = t.post("/context/create", json!({"filenames": ["a.fq"]})).await;
    let session_id = body["context"].as_str().unwrap().to_string();

    let (status, body) = t
        .post(
            &format!("/context/{session_id}/reads"),
            json!([[read("id", "ACGT")]]),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["processedReads"], 1);
    assert_eq!(body["pendingBytes"], 0);
}

#[tokio::test]
async fn budget_exceeded_leaves_state_unchanged() {
    let t = TestContext::new(10);

    let (_, body) = t.post("/context/create", json!({"filenames": ["a.fq"]})).await;
    let session_id = body["context"].as_str().unwrap().to_string();
    let parsed_id: ingest_api::models::SessionId = session_id.parse().unwrap();
    t.store
        .incr_by(&keys::pending_bytes(parsed_id), 7)
        .await
        .unwrap();

    let (status, body) = t
        .post(
            &format!("/context/{session_id}/reads"),
            json!([[read("id", "AAAAA")]]),
        )
        .await;

    assert_eq!(status, 422);
    assert_eq!(body["pendingBytes"], 7);
    assert!(body["retryAfter"].as_f64().unwrap() > 0.0);
    assert_eq!(
        t.registry.pending_bytes(parsed_id).await.unwrap(),
        7,
        "a rejected upload must not mutate pending_bytes"
    );
}

#[tokio::test]
async fn chunk_too_large_is_rejected_even_on_an_empty_session() {
    let t = TestContext::new(10);

    let (_, body) = t.post("/context/create", json!({"filenames": ["a.fq"]})).await;
    let session_id = body["context"].as_str().unwrap().to_string();

    // A lone oversize read is dropped by the pricing loop before the chunk
    // cost is ever compared against the budget (see
    // `oversize_read_is_dropped_and_counted`), so `ChunkTooLarge` requires
    // two or more in-budget reads whose summed cost exceeds the budget.
    let (status, body) = t
        .post(
            &format!("/context/{session_id}/reads"),
            json!([[read("id1", "AAAAAAAA")], [read("id2", "CCCCCCCC")]]),
        )
        .await;

    assert_eq!(status, 413);
    assert!(body["retryAfter"].as_f64().unwrap() > 0.0);

    let parsed_id: ingest_api::models::SessionId = session_id.parse().unwrap();
    assert_eq!(t.registry.pending_bytes(parsed_id).await.unwrap(), 0);
}

#[tokio::test]
async fn close_while_pending_returns_still_pending() {
    let t = TestContext::new(100);

    let (_, body) = t.post("/context/create", json!({"filenames": ["a.fq"]})).await;
    let session_id = body["context"].as_str().unwrap().to_string();
    let parsed_id: ingest_api::models::SessionId = session_id.parse().unwrap();
    t.store
        .incr_by(&keys::pending_bytes(parsed_id), 5)
        .await
        .unwrap();

    let (status, body) = t.post(&format!("/context/{session_id}/close"), json!({})).await;

    assert_eq!(status, 503);
    assert_eq!(body["pendingBytes"], 5);
    assert!(body["retryAfter"].as_f64().unwrap() > 0.0);

    // The session is still alive — a second create-less lookup still works.
    assert!(t.registry.exists(parsed_id).await.unwrap());
}

#[tokio::test]
async fn pair_count_mismatch_is_rejected() {
    let t = TestContext::new(100);

    let (_, body) = t
        .post("/context/create", json!({"filenames": ["a.fq", "b.fq"]}))
        .await;
    let session_id = body["context"].as_str().unwrap().to_string();

    let (status, body) = t
        .post(
            &format!("/context/{session_id}/reads"),
            json!([[read("id", "A")]]),
        )
        .await;

    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("pair"));
}

#[tokio::test]
async fn upload_against_unknown_session_is_not_found() {
    let t = TestContext::new(100);

    let (status, _) = t
        .post(
            &format!("/context/{}/reads", uuid::Uuid::new_v4()),
            json!([[read("id", "A")]]),
        )
        .await;

    assert_eq!(status, 404);
}

#[tokio::test]
async fn close_against_unknown_session_is_not_found() {
    let t = TestContext::new(100);

    let (status, _) = t
        .post(&format!("/context/{}/close", uuid::Uuid::new_v4()), json!({}))
        .await;

    assert_eq!(status, 404);
}

#[tokio::test]
async fn a_read_at_exactly_the_budget_is_accepted() {
    let t = TestContext::new(4);

    let (_, body) = t.post("/context/create", json!({"filenames": ["a.fq"]})).await;
    let session_id = body["context"].as_str().unwrap().to_string();

    let (status, body) = t
        .post(
            &format!("/context/{session_id}/reads"),
            json!([[read("id", "ACGT")]]),
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["pendingBytes"], 4);
}

#[tokio::test]
async fn a_read_one_byte_over_budget_is_dropped() {
    let t = TestContext::new(4);

    let (_, body) = t.post("/context/create", json!({"filenames": ["a.fq"]})).await;
    let session_id = body["context"].as_str().unwrap().to_string();

    let (status, body) = t
        .post(
            &format!("/context/{session_id}/reads"),
            json!([[read("id", "ACGTA")]]),
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["pendingBytes"], 0);
    assert_eq!(body["processedReads"], 1);
}

#[tokio::test]
async fn closing_an_untouched_session_returns_empty_results() {
    let t = TestContext::new(100);

    let (_, body) = t.post("/context/create", json!({"filenames": ["a.fq"]})).await;
    let session_id = body["context"].as_str().unwrap().to_string();

    let (status, body) = t.post(&format!("/context/{session_id}/close"), json!({})).await;

    assert_eq!(status, 200);
    assert_eq!(body["readsSaved"], json!([]));
    assert_eq!(body["readsProcessed"], 0);
}

#[tokio::test]
async fn create_rejects_empty_and_duplicate_filenames() {
    let t = TestContext::new(100);

    let (status, _) = t.post("/context/create", json!({"filenames": []})).await;
    assert_eq!(status, 400);

    let (status, _) = t
        .post("/context/create", json!({"filenames": ["a.fq", "a.fq"]}))
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn after_close_every_session_key_is_gone() {
    let t = TestContext::new(100);

    let (_, body) = t.post("/context/create", json!({"filenames": ["a.fq"]})).await;
    let session_id = body["context"].as_str().unwrap().to_string();
    let parsed_id: ingest_api::models::SessionId = session_id.parse().unwrap();

    t.post(&format!("/context/{session_id}/close"), json!({})).await;

    assert!(!t.registry.exists(parsed_id).await.unwrap());
    assert!(!t.store.exists(&keys::pending_bytes(parsed_id)).await.unwrap());
    assert!(!t
        .store
        .exists(&keys::pair_reads(parsed_id, 0))
        .await
        .unwrap());
}
