//! WebSocket mock server for the Deepgram speak API
//!
//! Accepts `Speak`, `Flush` and `Close` messages. Each flush answers with a
//! fixed number of binary audio chunks followed by a `Flushed` message.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// Behaviour of the mock backend.
#[derive(Debug, Clone)]
pub struct SpeakMockConfig {
    pub chunks_per_flush: usize,
    pub chunk_size: usize,
    /// Delay between audio chunks
    pub chunk_interval: Duration,
    /// Answer every `Speak` with an `Error` message instead of queueing it
    pub reject_speak: bool,
}

impl Default for SpeakMockConfig {
    fn default() -> Self {
        Self {
            chunks_per_flush: 3,
            chunk_size: 960,
            chunk_interval: Duration::from_millis(5),
            reject_speak: false,
        }
    }
}

/// What the mock observed.
#[derive(Default)]
pub struct SpeakMockStats {
    pub connections: AtomicU64,
    pub flushes: AtomicU64,
    pub request_uris: Mutex<Vec<String>>,
    pub auth_headers: Mutex<Vec<String>>,
    pub texts: Mutex<Vec<String>>,
    pub close_requests: AtomicU64,
}

impl SpeakMockStats {
    pub fn last_query(&self) -> Option<String> {
        self.request_uris
            .lock()
            .last()
            .and_then(|uri| uri.split_once('?').map(|(_, q)| q.to_string()))
    }
}

pub struct SpeakMockServer {
    pub addr: SocketAddr,
    pub stats: Arc<SpeakMockStats>,
    handle: JoinHandle<()>,
}

impl SpeakMockServer {
    pub async fn start(config: SpeakMockConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind speak mock");
        let addr = listener.local_addr().unwrap();
        let stats = Arc::new(SpeakMockStats::default());
        let config = Arc::new(config);

        let accept_stats = stats.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let stats = accept_stats.clone();
                let config = config.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, stats, config).await {
                        eprintln!("Speak mock connection error: {}", e);
                    }
                });
            }
        });

        Self {
            addr,
            stats,
            handle,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/v1/speak", self.addr)
    }
}

impl Drop for SpeakMockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_connection(
    stream: TcpStream,
    stats: Arc<SpeakMockStats>,
    config: Arc<SpeakMockConfig>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let header_stats = stats.clone();
    let ws_stream = accept_hdr_async(stream, move |req: &Request, resp: Response| {
        header_stats.request_uris.lock().push(req.uri().to_string());
        if let Some(auth) = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
        {
            header_stats.auth_headers.lock().push(auth.to_string());
        }
        Ok::<Response, ErrorResponse>(resp)
    })
    .await?;

    let (mut write, mut read) = ws_stream.split();
    let conn_id = stats.connections.fetch_add(1, Ordering::Relaxed) + 1;
    let mut sequence_id = 0u64;
    let mut sent_metadata = false;

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let Ok(request) = serde_json::from_str::<Value>(text.as_str()) else {
                    continue;
                };

                match request.get("type").and_then(|t| t.as_str()) {
                    Some("Speak") => {
                        let text = request
                            .get("text")
                            .and_then(|t| t.as_str())
                            .unwrap_or_default();
                        stats.texts.lock().push(text.to_string());

                        if config.reject_speak {
                            let error = json!({
                                "type": "Error",
                                "err_code": "INVALID_INPUT",
                                "err_msg": "Mock rejected text",
                                "description": format!("Rejected: {}", text),
                            });
                            write.send(Message::Text(error.to_string().into())).await?;
                            continue;
                        }

                        if !sent_metadata {
                            let metadata = json!({
                                "type": "Metadata",
                                "request_id": format!("req-{}", conn_id),
                                "model_name": "aura-asteria-en",
                                "model_version": "mock",
                                "model_uuid": "mock-uuid",
                            });
                            write.send(Message::Text(metadata.to_string().into())).await?;
                            sent_metadata = true;
                        }
                    }
                    Some("Flush") => {
                        stats.flushes.fetch_add(1, Ordering::Relaxed);
                        sequence_id += 1;

                        for i in 0..config.chunks_per_flush {
                            let chunk: Bytes = vec![(i % 256) as u8; config.chunk_size].into();
                            write.send(Message::Binary(chunk)).await?;
                            tokio::time::sleep(config.chunk_interval).await;
                        }

                        let flushed = json!({"type": "Flushed", "sequence_id": sequence_id});
                        write.send(Message::Text(flushed.to_string().into())).await?;
                    }
                    Some("Close") => {
                        stats.close_requests.fetch_add(1, Ordering::Relaxed);
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                    _ => {}
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(data)) => {
                write.send(Message::Pong(data)).await?;
            }
            Err(e) => {
                eprintln!("Speak mock WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    Ok(())
}
