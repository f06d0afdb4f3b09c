//! One relay session per client WebSocket.
//!
//! A session connects one backend client, runs one [`RelayEngine`] over the
//! backend's event channels, and forwards the client's text requests until
//! the client goes away. Backend, relay and client sink are released on
//! every exit path.

use std::fmt::Display;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use futures::{Stream, StreamExt};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::relay::{FrameSink, RelayEngine, RelayStats};
use crate::core::speak::{BoxedSpeakClient, SpeakClientFactory, SpeakOptions, event_channels};

use super::messages::SpeakRequest;

/// Lifecycle of a session. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Created,
    Connecting,
    Active,
    Closing,
    Closed,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Client closed the connection or the stream ended
    ClientClosed,
    /// Reading from the client failed
    ReadError,
    /// Backend client could not be created or connected
    ConnectFailed,
    /// Backend rejected a flush request
    FlushFailed,
    /// Writing to the client failed in the relay
    RelayWriteFailed,
}

/// Result of a finished session.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub end: SessionEnd,
    pub relay: RelayStats,
}

pub struct Session<S: ?Sized> {
    id: Uuid,
    state: SessionState,
    options: SpeakOptions,
    quiet_interval: Duration,
    sink: Arc<S>,
    shutdown: CancellationToken,
}

impl<S> Session<S>
where
    S: FrameSink + ?Sized + 'static,
{
    pub fn new(options: SpeakOptions, quiet_interval: Duration, sink: Arc<S>) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Created,
            options,
            quiet_interval,
            sink,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn options(&self) -> &SpeakOptions {
        &self.options
    }

    fn transition(&mut self, next: SessionState) {
        if next <= self.state {
            warn!(
                session_id = %self.id,
                "Ignoring session transition {:?} -> {:?}", self.state, next
            );
            return;
        }
        debug!(session_id = %self.id, "Session {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run the session to completion against the client's inbound stream.
    pub async fn run<R, E>(
        mut self,
        factory: &dyn SpeakClientFactory,
        mut inbound: R,
    ) -> SessionOutcome
    where
        R: Stream<Item = Result<Message, E>> + Unpin + Send,
        E: Display,
    {
        info!(
            session_id = %self.id,
            model = %self.options.model,
            provider = factory.provider_name(),
            "Starting speak session"
        );
        self.transition(SessionState::Connecting);

        let (senders, receivers) = event_channels();

        // The relay drains the channels from the start so backend events
        // (including Open) never wait on an absent consumer.
        let relay = RelayEngine::new(self.options.sample_rate)
            .with_quiet_interval(self.quiet_interval)
            .with_shutdown_token(self.shutdown.clone());
        let relay_handle = tokio::spawn(relay.run(receivers, self.sink.clone()));

        let mut client = match factory.create(self.options.clone(), senders) {
            Ok(client) => Some(client),
            Err(e) => {
                error!(session_id = %self.id, "Failed to create speak client: {}", e);
                None
            }
        };

        let end = match client.as_mut() {
            None => SessionEnd::ConnectFailed,
            Some(client) => match client.connect().await {
                Ok(()) => {
                    self.transition(SessionState::Active);
                    self.read_loop(client, &mut inbound).await
                }
                Err(e) => {
                    error!(session_id = %self.id, "Failed to connect to speak backend: {}", e);
                    SessionEnd::ConnectFailed
                }
            },
        };

        self.transition(SessionState::Closing);
        info!(session_id = %self.id, "Closing speak session: {:?}", end);

        if let Some(mut client) = client.take() {
            if let Err(e) = client.disconnect().await {
                error!(session_id = %self.id, "Failed to disconnect speak client: {}", e);
            }
            // Dropping the client releases any channel senders it still holds.
            drop(client);
        }

        let relay = match relay_handle.await {
            Ok(stats) => stats,
            Err(e) => {
                error!(session_id = %self.id, "Relay task failed: {}", e);
                RelayStats::default()
            }
        };

        if let Err(e) = self.sink.close().await {
            debug!(session_id = %self.id, "Client sink close failed: {}", e);
        }

        self.transition(SessionState::Closed);
        info!(
            session_id = %self.id,
            frames = relay.total_frames(),
            "Speak session closed"
        );

        SessionOutcome { end, relay }
    }

    async fn read_loop<R, E>(&self, client: &mut BoxedSpeakClient, inbound: &mut R) -> SessionEnd
    where
        R: Stream<Item = Result<Message, E>> + Unpin + Send,
        E: Display,
    {
        loop {
            let next = select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    warn!(session_id = %self.id, "Client write failed, ending session");
                    return SessionEnd::RelayWriteFailed;
                }
                next = inbound.next() => next,
            };

            match next {
                Some(Ok(Message::Text(text))) => {
                    if let ControlFlow::Break(end) = self.handle_text(client, text.as_str()).await
                    {
                        return end;
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    debug!(session_id = %self.id, bytes = data.len(), "Ignoring binary message");
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(session_id = %self.id, "Client closed connection: {:?}", frame);
                    return SessionEnd::ClientClosed;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(session_id = %self.id, "Failed to read from client: {}", e);
                    return SessionEnd::ReadError;
                }
                None => {
                    info!(session_id = %self.id, "Client connection ended");
                    return SessionEnd::ClientClosed;
                }
            }
        }
    }

    async fn handle_text(
        &self,
        client: &mut BoxedSpeakClient,
        text: &str,
    ) -> ControlFlow<SessionEnd> {
        let request: SpeakRequest = match serde_json::from_str(text) {
            Ok(request) => request,
            Err(e) => {
                warn!(session_id = %self.id, "Failed to parse speak request: {}", e);
                return ControlFlow::Continue(());
            }
        };

        if request.text.is_empty() {
            warn!(session_id = %self.id, "Text is required in the request");
            return ControlFlow::Continue(());
        }

        debug!(session_id = %self.id, chars = request.text.len(), "Forwarding text");

        if let Err(e) = client.speak(&request.text).await {
            error!(session_id = %self.id, "Failed to send text to backend: {}", e);
        }

        if let Err(e) = client.flush().await {
            error!(session_id = %self.id, "Failed to flush backend: {}", e);
            return ControlFlow::Break(SessionEnd::FlushFailed);
        }

        ControlFlow::Continue(())
    }
}
