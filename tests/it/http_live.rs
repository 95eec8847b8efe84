//! Exercises the HTTP frontend over a real bound socket instead of
//! `tower::ServiceExt::oneshot`, the way `control`'s own
//! `tests/it/health_check.rs` does with `reqwest` against a `spawn_app()`
//! server. Most scenarios live in `http_sessions.rs` against the in-process
//! router; this file just confirms the same router behaves identically once
//! it's actually listening on a socket.

use crate::support::SpawnedApp;

#[tokio::test]
async fn server_status_works_over_a_real_socket() {
    let app = SpawnedApp::spawn(100, 1, 1000).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{}/server-status", app.addr))
        .send()
        .await
        .expect("failed to execute request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("response was not JSON");
    assert_eq!(body["bufferSize"], 100);
}

#[tokio::test]
async fn create_and_close_an_empty_session_over_a_real_socket() {
    let app = SpawnedApp::spawn(100, 1, 1000).await;
    let client = reqwest::Client::new();

    let created: serde_json::Value = client
        .post(format!("http://{}/context/create", app.addr))
        .json(&serde_json::json!({"filenames": ["a.fq"]}))
        .send()
        .await
        .expect("failed to create context")
        .json()
        .await
        .expect("response was not JSON");
    let session_id = created["context"].as_str().unwrap();

    let closed = client
        .post(format!("http://{}/context/{session_id}/close", app.addr))
        .send()
        .await
        .expect("failed to close context");

    assert!(closed.status().is_success());
}
