// Integration tests running a real client against a scripted relay
// endpoint over local TCP.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use camrelay::{
    BufferSink, ClientConfig, ClientEvent, ConnectionState, RelayClient, StreamStatus,
};
use common::{RelayScript, spawn_relay, wait_for_status};

fn test_config() -> ClientConfig {
    ClientConfig::builder()
        .connect_timeout(Duration::from_secs(1))
        .base_delay(Duration::from_millis(30))
        .max_delay(Duration::from_millis(100))
        .max_reconnect_attempts(3)
        .heartbeat_interval(Duration::from_secs(5))
        .liveness_timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to build test config")
}

fn client_for(addr: SocketAddr, sink: Arc<BufferSink>) -> RelayClient {
    common::init_logging();
    let endpoint = format!("tcp://{}", addr);
    RelayClient::with_config(&endpoint, test_config(), sink).expect("Failed to build client")
}

#[tokio::test]
async fn test_play_connects_and_reaches_playing() {
    let (addr, relay) = spawn_relay(RelayScript::default()).await;
    let sink = Arc::new(BufferSink::new());
    let client = client_for(addr, sink.clone());

    assert_eq!(client.connection_state().await, ConnectionState::Uninstantiated);

    client.init().await.expect("init failed");
    client.play("rtsp://cam1.local/live").await.expect("play failed");

    // First frame, not the start ack, flips the session to playing
    wait_for_status(&client, StreamStatus::Playing, Duration::from_secs(3)).await;

    assert!(sink.len().await >= 1);
    assert_eq!(client.connection_state().await, ConnectionState::Open);
    assert!(client.latest_frame().await.is_some());

    client.dispose().await.expect("dispose failed");
    relay.abort();
}

#[tokio::test]
async fn test_status_events_reach_the_rendering_layer() {
    let (addr, relay) = spawn_relay(RelayScript::default()).await;
    let sink = Arc::new(BufferSink::new());
    let client = client_for(addr, sink);
    let mut events = client.events().await.expect("events already taken");

    client.init().await.expect("init failed");
    client.play("rtsp://cam1.local/live").await.expect("play failed");

    // Expect loading then playing, in order
    let mut seen = Vec::new();
    while seen.len() < 2 {
        let event = tokio::time::timeout(Duration::from_secs(3), events.recv())
            .await
            .expect("Timed out waiting for status event")
            .expect("Event channel closed");
        if let ClientEvent::Status(status) = event {
            seen.push(status);
        }
    }
    assert_eq!(seen, vec![StreamStatus::Loading, StreamStatus::Playing]);

    client.dispose().await.expect("dispose failed");
    relay.abort();
}

#[tokio::test]
async fn test_stop_discards_late_frames() {
    let script = RelayScript {
        frames_per_start: 1,
        late_frame_after_stop: true,
        ..RelayScript::default()
    };
    let (addr, relay) = spawn_relay(script).await;
    let sink = Arc::new(BufferSink::new());
    let client = client_for(addr, sink.clone());

    client.init().await.expect("init failed");
    client.play("rtsp://cam1.local/live").await.expect("play failed");
    wait_for_status(&client, StreamStatus::Playing, Duration::from_secs(3)).await;
    let rendered = sink.len().await;

    client.stop().await.expect("stop failed");
    assert_eq!(client.status().await, StreamStatus::Stopped);
    assert!(client.latest_frame().await.is_none());

    // The relay pushes one more frame after confirming the stop; it must
    // never be rendered
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(sink.len().await, rendered);
    assert_eq!(client.status().await, StreamStatus::Stopped);

    client.dispose().await.expect("dispose failed");
    relay.abort();
}

#[tokio::test]
async fn test_reconnect_resumes_playback_after_drop() {
    let script = RelayScript {
        drop_first_connections: 1,
        ..RelayScript::default()
    };
    let (addr, relay) = spawn_relay(script).await;
    let sink = Arc::new(BufferSink::new());
    let client = client_for(addr, sink.clone());

    client.init().await.expect("init failed");
    client.play("rtsp://cam1.local/live").await.expect("play failed");

    // The first connection dies right after the start ack; the client must
    // reconnect and re-issue the start on its own
    wait_for_status(&client, StreamStatus::Playing, Duration::from_secs(5)).await;
    assert!(sink.len().await >= 1);

    client.dispose().await.expect("dispose failed");
    relay.abort();
}

#[tokio::test]
async fn test_reconnect_exhaustion_is_terminal() {
    // Reserve a port with nothing listening on it
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let sink = Arc::new(BufferSink::new());
    let client = client_for(addr, sink);
    let mut events = client.events().await.expect("events already taken");

    client.init().await.expect("init failed");
    client.play("rtsp://cam1.local/live").await.expect("play failed");

    // Exactly one terminal failure event for the whole retry budget
    let mut terminal = 0;
    let deadline = tokio::time::sleep(Duration::from_secs(3));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(ClientEvent::ReconnectFailed { attempts }) => {
                        assert_eq!(attempts, 3);
                        terminal += 1;
                    }
                    Some(_) => {}
                    None => break,
                }
            }
            _ = &mut deadline => break,
        }
    }
    assert_eq!(terminal, 1);

    let session = client.session().await;
    assert_eq!(session.status, StreamStatus::Error);
    assert_eq!(
        session.last_error.as_deref(),
        Some("Connection failed after 3 attempts")
    );
    assert_eq!(client.connection_state().await, ConnectionState::Closed);

    client.dispose().await.expect("dispose failed");
}

#[tokio::test]
async fn test_available_streams_round_trip() {
    let (addr, relay) = spawn_relay(RelayScript::default()).await;
    let sink = Arc::new(BufferSink::new());
    let client = client_for(addr, sink);

    client.init().await.expect("init failed");

    // Wait for the transport before asking
    tokio::time::timeout(Duration::from_secs(3), async {
        while client.connection_state().await != ConnectionState::Open {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Timed out waiting for open transport");

    client
        .request_available_streams()
        .await
        .expect("request failed");

    tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            let streams = client.available_streams().await;
            if !streams.is_empty() {
                assert_eq!(
                    streams.get("lobby").map(String::as_str),
                    Some("rtsp://cam1.local/live")
                );
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Timed out waiting for the source map");

    client.dispose().await.expect("dispose failed");
    relay.abort();
}

#[tokio::test]
async fn test_dispose_closes_everything() {
    let (addr, relay) = spawn_relay(RelayScript::default()).await;
    let sink = Arc::new(BufferSink::new());
    let client = client_for(addr, sink);

    client.init().await.expect("init failed");
    client.play("rtsp://cam1.local/live").await.expect("play failed");
    wait_for_status(&client, StreamStatus::Playing, Duration::from_secs(3)).await;

    client.dispose().await.expect("dispose failed");

    assert_eq!(client.status().await, StreamStatus::Stopped);
    tokio::time::timeout(Duration::from_secs(2), async {
        while client.connection_state().await != ConnectionState::Closed {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Timed out waiting for the connection to close");

    relay.abort();
}
