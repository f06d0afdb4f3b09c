//! Deepgram streaming speak WebSocket client.
//!
//! One client is created per browser session. After the handshake a single
//! I/O task owns both halves of the backend socket: outgoing requests are
//! queued on an unbounded channel, incoming frames are routed onto the
//! session's event channels.
//!
//! # Example
//!
//! ```rust,ignore
//! use speak_relay::core::speak::{DeepgramSpeak, DeepgramSpeakConfig, SpeakClient, SpeakOptions, event_channels};
//!
//! let (senders, receivers) = event_channels();
//! let config = DeepgramSpeakConfig::new("your-api-key", SpeakOptions::default());
//! let mut client = DeepgramSpeak::new(config, senders)?;
//! client.connect().await?;
//! client.speak("Hello, world!").await?;
//! client.flush().await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header::AUTHORIZATION};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, error, info, trace, warn};

use super::config::DeepgramSpeakConfig;
use super::messages::{SpeakClientMessage, SpeakServerMessage, parse_server_message};
use crate::core::speak::base::{
    BoxedSpeakClient, ConnectionState, SpeakClient, SpeakClientFactory, SpeakError,
    SpeakOptions, SpeakResult,
};
use crate::core::speak::events::{CloseResponse, ErrorResponse, EventSenders, OpenResponse};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long `disconnect` waits for the I/O task to drain before aborting it.
const DISCONNECT_GRACE: Duration = Duration::from_secs(5);

// =============================================================================
// DeepgramSpeak Client
// =============================================================================

pub struct DeepgramSpeak {
    config: DeepgramSpeakConfig,

    /// Current connection state.
    state: Arc<RwLock<ConnectionState>>,

    /// Event channel producers. Taken on disconnect so the channels close.
    events: Option<EventSenders>,

    /// Queue of outgoing messages for the I/O task.
    ws_sender: Option<mpsc::UnboundedSender<SpeakClientMessage>>,

    /// Handle to the I/O task.
    task_handle: Option<JoinHandle<()>>,
}

impl DeepgramSpeak {
    pub fn new(config: DeepgramSpeakConfig, events: EventSenders) -> SpeakResult<Self> {
        config.validate()?;

        Ok(Self {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            events: Some(events),
            ws_sender: None,
            task_handle: None,
        })
    }

    pub fn options(&self) -> &SpeakOptions {
        &self.config.options
    }

    async fn connect_internal(&mut self) -> SpeakResult<()> {
        let events = self.events.clone().ok_or(SpeakError::NotConnected)?;

        let url = self.config.build_websocket_url()?;
        debug!(
            model = %self.config.options.model,
            sample_rate = self.config.options.sample_rate,
            "Connecting to Deepgram speak: {}",
            url.as_str().split('?').next().unwrap_or_default()
        );

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| SpeakError::InvalidConfiguration(format!("Invalid request: {e}")))?;
        let auth = HeaderValue::from_str(&format!("Token {}", self.config.api_key))
            .map_err(|e| SpeakError::InvalidConfiguration(format!("Invalid API key: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, auth);

        *self.state.write().await = ConnectionState::Connecting;

        let connect_result = match self.config.connect_timeout {
            Some(limit) => match timeout(limit, connect_async(request)).await {
                Ok(result) => result,
                Err(_) => {
                    *self.state.write().await = ConnectionState::Failed;
                    return Err(SpeakError::Timeout("Connection timed out".to_string()));
                }
            },
            None => connect_async(request).await,
        };

        let (ws_stream, response) = match connect_result {
            Ok(pair) => pair,
            Err(e) => {
                *self.state.write().await = ConnectionState::Failed;
                return Err(SpeakError::ConnectionFailed(format!(
                    "WebSocket connection failed: {e}"
                )));
            }
        };

        info!("Connected to Deepgram speak (status: {})", response.status());

        let (ws_write, ws_read) = ws_stream.split();
        let (tx, rx) = mpsc::unbounded_channel();
        self.ws_sender = Some(tx);

        let state = self.state.clone();
        let loop_events = events.clone();
        let handle = tokio::spawn(async move {
            Self::message_loop(ws_write, ws_read, rx, state, loop_events).await;
        });
        self.task_handle = Some(handle);

        *self.state.write().await = ConnectionState::Connected;

        events.send_open(OpenResponse::default()).await;

        Ok(())
    }

    fn send_message(&self, msg: SpeakClientMessage) -> SpeakResult<()> {
        let sender = self.ws_sender.as_ref().ok_or(SpeakError::NotConnected)?;

        sender
            .send(msg)
            .map_err(|e| SpeakError::WebSocketError(format!("Failed to queue message: {e}")))
    }

    /// Owns the backend socket until either side closes it.
    async fn message_loop(
        mut ws_write: SplitSink<WsStream, Message>,
        mut ws_read: SplitStream<WsStream>,
        mut rx: mpsc::UnboundedReceiver<SpeakClientMessage>,
        state: Arc<RwLock<ConnectionState>>,
        events: EventSenders,
    ) {
        loop {
            tokio::select! {
                outgoing = rx.recv() => {
                    let Some(msg) = outgoing else {
                        // Client side dropped the queue: close the socket.
                        let _ = ws_write.send(Message::Close(None)).await;
                        break;
                    };

                    match msg.to_json() {
                        Ok(json) => {
                            trace!("Sending speak message: {}", json.chars().take(100).collect::<String>());
                            if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                                error!("Failed to send WebSocket message: {e}");
                                events
                                    .send_error(ErrorResponse::new(
                                        "WEBSOCKET_WRITE",
                                        "Failed to send message to backend",
                                        e.to_string(),
                                    ))
                                    .await;
                                break;
                            }
                        }
                        Err(e) => {
                            error!("Failed to serialize speak message: {e}");
                        }
                    }
                }

                incoming = ws_read.next() => {
                    match incoming {
                        Some(Ok(Message::Binary(data))) => {
                            trace!(bytes = data.len(), "Received audio chunk");
                            events.send_audio(data).await;
                        }
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_server_text(text.as_str(), &events).await;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!("Deepgram speak WebSocket closed: {:?}", frame);
                            break;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = ws_write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!("Deepgram speak WebSocket error: {e}");
                            events
                                .send_error(ErrorResponse::new(
                                    "WEBSOCKET_READ",
                                    "Backend connection failed",
                                    e.to_string(),
                                ))
                                .await;
                            break;
                        }
                        None => break,
                    }
                }
            }
        }

        *state.write().await = ConnectionState::Disconnected;
        events.send_close(CloseResponse::default()).await;
        info!("Deepgram speak message loop ended");
    }

    async fn handle_server_text(text: &str, events: &EventSenders) {
        let msg = match parse_server_message(text) {
            Ok(m) => m,
            Err(e) => {
                warn!("Failed to deserialize speak message: {e}");
                return;
            }
        };

        match msg {
            SpeakServerMessage::Flushed(flushed) => {
                debug!(sequence_id = flushed.sequence_id, "Flushed");
                events.send_flushed(flushed).await;
            }
            SpeakServerMessage::Error(err) => {
                error!(
                    err_code = %err.err_code,
                    description = %err.description,
                    "Deepgram speak error: {}",
                    err.err_msg
                );
                events.send_error(err).await;
            }
            SpeakServerMessage::Metadata(meta) => {
                info!(
                    request_id = %meta.request_id,
                    model = %meta.model_name,
                    "Deepgram speak metadata"
                );
            }
            SpeakServerMessage::Warning(warning) => {
                warn!(
                    warn_code = %warning.warn_code,
                    "Deepgram speak warning: {}",
                    warning.warn_msg
                );
            }
            SpeakServerMessage::Cleared { sequence_id } => {
                debug!(sequence_id, "Cleared");
            }
            SpeakServerMessage::Unknown(kind) => {
                trace!("Unknown message type received: {kind}");
            }
        }
    }
}

#[async_trait]
impl SpeakClient for DeepgramSpeak {
    async fn connect(&mut self) -> SpeakResult<()> {
        self.connect_internal().await
    }

    async fn speak(&mut self, text: &str) -> SpeakResult<()> {
        self.send_message(SpeakClientMessage::Speak {
            text: text.to_string(),
        })
    }

    async fn flush(&mut self) -> SpeakResult<()> {
        self.send_message(SpeakClientMessage::Flush)
    }

    async fn disconnect(&mut self) -> SpeakResult<()> {
        if let Some(sender) = self.ws_sender.take() {
            let _ = sender.send(SpeakClientMessage::Close);
        }

        if let Some(mut handle) = self.task_handle.take()
            && timeout(DISCONNECT_GRACE, &mut handle).await.is_err()
        {
            warn!("Deepgram speak I/O task did not stop in time, aborting");
            handle.abort();
        }

        // Last producer handle: every event channel closes here.
        self.events.take();

        *self.state.write().await = ConnectionState::Disconnected;
        info!("Disconnected from Deepgram speak");

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.ws_sender.is_some()
            && self
                .state
                .try_read()
                .map(|s| *s == ConnectionState::Connected)
                .unwrap_or(false)
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Creates [`DeepgramSpeak`] clients from server-wide settings.
pub struct DeepgramSpeakFactory {
    api_key: String,
    speak_url: String,
    connect_timeout: Option<Duration>,
}

impl DeepgramSpeakFactory {
    pub fn new(
        api_key: impl Into<String>,
        speak_url: impl Into<String>,
        connect_timeout: Option<Duration>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            speak_url: speak_url.into(),
            connect_timeout,
        }
    }
}

impl Drop for DeepgramSpeakFactory {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.api_key.zeroize();
    }
}

impl SpeakClientFactory for DeepgramSpeakFactory {
    fn create(&self, options: SpeakOptions, events: EventSenders) -> SpeakResult<BoxedSpeakClient> {
        let config = DeepgramSpeakConfig::new(self.api_key.clone(), options)
            .with_speak_url(self.speak_url.clone())
            .with_connect_timeout(self.connect_timeout);

        Ok(Box::new(DeepgramSpeak::new(config, events)?))
    }

    fn provider_name(&self) -> &'static str {
        "deepgram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::speak::events::event_channels;

    #[test]
    fn test_creation_requires_api_key() {
        let (senders, _receivers) = event_channels();
        let result = DeepgramSpeak::new(DeepgramSpeakConfig::default(), senders);
        assert!(matches!(result, Err(SpeakError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_initial_state() {
        let (senders, _receivers) = event_channels();
        let client =
            DeepgramSpeak::new(DeepgramSpeakConfig::new("key", SpeakOptions::default()), senders)
                .unwrap();
        assert!(!client.is_connected());
        assert_eq!(client.options().model, "aura-asteria-en");
    }

    #[tokio::test]
    async fn test_send_without_connection() {
        let (senders, _receivers) = event_channels();
        let mut client =
            DeepgramSpeak::new(DeepgramSpeakConfig::new("key", SpeakOptions::default()), senders)
                .unwrap();

        assert!(matches!(
            client.speak("Hello").await,
            Err(SpeakError::NotConnected)
        ));
        assert!(matches!(client.flush().await, Err(SpeakError::NotConnected)));
    }

    #[tokio::test]
    async fn test_disconnect_without_connection_closes_channels() {
        let (senders, mut receivers) = event_channels();
        let mut client =
            DeepgramSpeak::new(DeepgramSpeakConfig::new("key", SpeakOptions::default()), senders)
                .unwrap();

        client.disconnect().await.unwrap();
        assert!(receivers.open.recv().await.is_none());
        assert!(receivers.audio.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_connect_refused_is_session_error() {
        let (senders, _receivers) = event_channels();
        // Port 9 (discard) is never a WebSocket server on loopback.
        let config = DeepgramSpeakConfig::new("key", SpeakOptions::default())
            .with_speak_url("ws://127.0.0.1:9/v1/speak")
            .with_connect_timeout(Some(Duration::from_secs(2)));
        let mut client = DeepgramSpeak::new(config, senders).unwrap();

        let result = client.connect().await;
        assert!(matches!(
            result,
            Err(SpeakError::ConnectionFailed(_)) | Err(SpeakError::Timeout(_))
        ));
        assert!(!client.is_connected());
    }

    #[test]
    fn test_factory_rejects_missing_key() {
        let factory = DeepgramSpeakFactory::new("", "wss://api.deepgram.com/v1/speak", None);
        let (senders, _receivers) = event_channels();
        assert!(factory.create(SpeakOptions::default(), senders).is_err());
        assert_eq!(factory.provider_name(), "deepgram");
    }
}
