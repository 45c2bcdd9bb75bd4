///! End-to-end tests for the realtime gateway over a real WebSocket
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use orbitcast_backend::config::Config;
use orbitcast_backend::iss::{ConnectionRegistry, PositionBroadcaster, PositionReport, PositionSource};
use orbitcast_backend::server::{build_router, AppState};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::tungstenite::protocol::Message;

/// Always reports the same position, on a fast cadence for test speed
struct FixedSource;

#[async_trait]
impl PositionSource for FixedSource {
    async fn fetch(&self) -> PositionReport {
        PositionReport::position(Some(48.85), Some(2.35), "FR")
    }
}

async fn spawn_gateway() -> (String, Arc<ConnectionRegistry>) {
    let broadcaster = PositionBroadcaster::new(Arc::new(FixedSource), Duration::from_millis(20));
    let registry = Arc::new(ConnectionRegistry::new(broadcaster));
    let app = build_router(&Config::default(), AppState::new(Arc::clone(&registry)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("ws://{}/ws", addr), registry)
}

/// Poll until the registry reports the expected client count
async fn wait_for_client_count(registry: &ConnectionRegistry, expected: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if registry.client_count().await == expected {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "client count never reached {}",
            expected
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_connected_client_receives_iss_update_frames() {
    let (url, registry) = spawn_gateway().await;

    let (mut socket, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    wait_for_client_count(&registry, 1).await;
    assert!(registry.is_broadcasting().await);

    let frame = socket.next().await.unwrap().unwrap();
    let body: serde_json::Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
    assert_eq!(body["type"], "iss_update");
    assert_eq!(body["latitude"], 48.85);
    assert_eq!(body["longitude"], 2.35);
    assert_eq!(body["country_code"], "FR");
    assert!(body.get("error").is_none());

    socket.close(None).await.unwrap();
    wait_for_client_count(&registry, 0).await;
}

#[tokio::test]
async fn test_closing_one_client_leaves_the_other_receiving() {
    let (url, registry) = spawn_gateway().await;

    let (first, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    let (mut second, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    wait_for_client_count(&registry, 2).await;

    // Tear the first connection down without a close handshake
    drop(first);
    wait_for_client_count(&registry, 1).await;

    // The surviving client still gets fresh frames
    for _ in 0..3 {
        let frame = second.next().await.unwrap().unwrap();
        let body: serde_json::Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
        assert_eq!(body["type"], "iss_update");
    }

    second.close(None).await.unwrap();
    wait_for_client_count(&registry, 0).await;

    // The loop stays up after the last client leaves
    assert!(registry.is_broadcasting().await);
}

#[tokio::test]
async fn test_client_text_frames_are_ignored() {
    let (url, registry) = spawn_gateway().await;

    let (mut socket, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    wait_for_client_count(&registry, 1).await;

    socket
        .send(Message::Text("unexpected inbound".into()))
        .await
        .unwrap();

    // The connection survives and updates keep flowing
    let frame = socket.next().await.unwrap().unwrap();
    let body: serde_json::Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
    assert_eq!(body["type"], "iss_update");

    socket.close(None).await.unwrap();
    wait_for_client_count(&registry, 0).await;
}
