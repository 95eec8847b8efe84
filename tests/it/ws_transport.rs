//! Exercises the message transport end to end over a real socket, since a
//! WebSocket upgrade can't be driven through `tower::ServiceExt::oneshot`
//! (see `support::context::SpawnedApp`).

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use ingest_api::store::StateStore;
use serde_json::{json, Value};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::support::SpawnedApp;

async fn next_event(
    socket: &mut tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("timed out waiting for a server event")
        .expect("socket closed unexpectedly")
        .expect("websocket protocol error");

    match msg {
        Message::Text(text) => serde_json::from_str(&text).expect("malformed server event"),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

#[tokio::test]
async fn create_context_fans_out_initial_data_requests() {
    let app = SpawnedApp::spawn(100, 3, 1000).await;
    let (mut socket, _) = connect_async(app.ws_url()).await.unwrap();

    socket
        .send(Message::Text(
            json!({"event": "createContext", "payload": {"filenames": ["a.fq"]}}).to_string(),
        ))
        .await
        .unwrap();

    for _ in 0..3 {
        let event = next_event(&mut socket).await;
        assert_eq!(event["event"], "dataRequest");
        assert_eq!(event["payload"]["bytes"], 1000);
    }
}

#[tokio::test]
async fn upload_and_close_over_the_socket() {
    let app = SpawnedApp::spawn(100, 1, 1000).await;
    let (mut socket, _) = connect_async(app.ws_url()).await.unwrap();

    socket
        .send(Message::Text(
            json!({"event": "createContext", "payload": {"filenames": ["a.fq"]}}).to_string(),
        ))
        .await
        .unwrap();

    let fanout = next_event(&mut socket).await;
    let context_id = fanout["payload"]["contextId"].as_str().unwrap().to_string();

    socket
        .send(Message::Text(
            json!({
                "event": "dataUpload",
                "payload": {
                    "data": [[["id1", "ACGT", "+", "####"]]],
                    "bytes": 4,
                    "contextId": context_id,
                }
            })
            .to_string(),
        ))
        .await
        .unwrap();

    // No dataUploadError should arrive for a well-formed, in-budget upload;
    // give the handler a moment then drain pending_bytes the way a filter
    // worker would before closing.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let parsed_id: ingest_api::models::SessionId = context_id.parse().unwrap();
    app.store
        .incr_by(&crate::support::keys::pending_bytes(parsed_id), -4)
        .await
        .unwrap();

    socket
        .send(Message::Text(
            json!({"event": "closeContext", "payload": {"contextId": context_id}}).to_string(),
        ))
        .await
        .unwrap();

    let closed = next_event(&mut socket).await;
    assert_eq!(closed["event"], "contextClosed");
    assert_eq!(closed["payload"]["contextId"], context_id);
    assert_eq!(closed["payload"]["processedReads"], 0);
}

#[tokio::test]
async fn malformed_upload_reports_data_upload_error() {
    let app = SpawnedApp::spawn(100, 1, 1000).await;
    let (mut socket, _) = connect_async(app.ws_url()).await.unwrap();

    socket
        .send(Message::Text(
            json!({"event": "createContext", "payload": {"filenames": ["a.fq", "b.fq"]}}).to_string(),
        ))
        .await
        .unwrap();

    let fanout = next_event(&mut socket).await;
    let context_id = fanout["payload"]["contextId"].as_str().unwrap().to_string();

    socket
        .send(Message::Text(
            json!({
                "event": "dataUpload",
                "payload": {
                    // Session has pair_count 2, this batch has only 1.
                    "data": [[["id1", "ACGT", "+", "####"]]],
                    "bytes": 4,
                    "contextId": context_id,
                }
            })
            .to_string(),
        ))
        .await
        .unwrap();

    let err = next_event(&mut socket).await;
    assert_eq!(err["event"], "dataUploadError");
    assert!(err["payload"]["message"].is_string());
}
