// Shared helpers for the integration tests
//
// Stands up a scripted relay endpoint on a local TCP port speaking the
// newline-delimited JSON protocol, so a real client can run against it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use camrelay::{RelayClient, RelayCommand, RelayEvent, StreamStatus};

/// Behavior of the scripted relay endpoint
#[derive(Debug, Clone)]
pub struct RelayScript {
    /// Frames pushed after each accepted start command
    pub frames_per_start: usize,

    /// Connections to drop right after acknowledging the start
    pub drop_first_connections: usize,

    /// Push one extra frame after confirming a stop
    pub late_frame_after_stop: bool,

    /// Source map returned for get_available_streams
    pub available: HashMap<String, String>,
}

impl Default for RelayScript {
    fn default() -> Self {
        let mut available = HashMap::new();
        available.insert("lobby".to_string(), "rtsp://cam1.local/live".to_string());

        RelayScript {
            frames_per_start: 3,
            drop_first_connections: 0,
            late_frame_after_stop: false,
            available,
        }
    }
}

/// Route library logs to the test harness when RUST_LOG is set
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Base64 of a minimal JPEG payload
pub fn jpeg_frame_b64() -> String {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    data.extend_from_slice(b"JFIF\0");
    data.extend_from_slice(&[0xFF, 0xD9]);
    STANDARD.encode(data)
}

/// Start a scripted relay endpoint on an ephemeral port
pub async fn spawn_relay(script: RelayScript) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind relay listener");
    let addr = listener.local_addr().expect("Failed to read local addr");

    let handle = tokio::spawn(async move {
        let connections = Arc::new(AtomicUsize::new(0));
        loop {
            let Ok((stream, _peer)) = listener.accept().await else {
                break;
            };
            let index = connections.fetch_add(1, Ordering::SeqCst);
            let script = script.clone();
            tokio::spawn(async move {
                handle_connection(stream, script, index).await;
            });
        }
    });

    (addr, handle)
}

async fn handle_connection(stream: TcpStream, script: RelayScript, index: usize) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let Ok(command) = RelayCommand::decode(&line) else {
            continue;
        };

        match command {
            RelayCommand::StartStream { .. } => {
                send_event(&mut write_half, &RelayEvent::Started).await;

                if index < script.drop_first_connections {
                    // Simulate a relay crash right after the ack
                    return;
                }

                for _ in 0..script.frames_per_start {
                    send_event(
                        &mut write_half,
                        &RelayEvent::Frame {
                            frame: jpeg_frame_b64(),
                        },
                    )
                    .await;
                }
            }
            RelayCommand::StopStream => {
                send_event(&mut write_half, &RelayEvent::Stopped).await;

                if script.late_frame_after_stop {
                    send_event(
                        &mut write_half,
                        &RelayEvent::Frame {
                            frame: jpeg_frame_b64(),
                        },
                    )
                    .await;
                }
            }
            RelayCommand::Ping => {
                send_event(&mut write_half, &RelayEvent::Pong).await;
            }
            RelayCommand::GetAvailableStreams => {
                send_event(
                    &mut write_half,
                    &RelayEvent::AvailableStreams {
                        streams: script.available.clone(),
                    },
                )
                .await;
            }
        }
    }
}

async fn send_event(writer: &mut OwnedWriteHalf, event: &RelayEvent) {
    let text = event.encode().expect("Failed to encode relay event");
    let _ = writer.write_all(text.as_bytes()).await;
    let _ = writer.write_all(b"\n").await;
    let _ = writer.flush().await;
}

/// Poll until the client reports the wanted status
pub async fn wait_for_status(client: &RelayClient, status: StreamStatus, deadline: Duration) {
    let waited = tokio::time::timeout(deadline, async {
        loop {
            if client.status().await == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    if waited.is_err() {
        panic!(
            "Timed out waiting for status {:?}, current: {:?}",
            status,
            client.status().await
        );
    }
}
