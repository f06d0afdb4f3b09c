//! Base traits and types for streaming speech-synthesis backends.
//!
//! The relay only needs a narrow capability from a backend: connect, accept
//! text, flush, and disconnect. Everything the backend says back arrives on
//! the [`EventSenders`](super::events::EventSenders) handed to the client at
//! construction time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::events::EventSenders;

/// Encoding requested from the backend. The relay frames output as 16-bit PCM,
/// so this is not configurable.
pub const LINEAR16_ENCODING: &str = "linear16";

/// Model used when the client does not name one.
pub const DEFAULT_MODEL: &str = "aura-asteria-en";

/// Sample rate used when the configuration does not override it.
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while talking to a synthesis backend.
#[derive(Debug, Error)]
pub enum SpeakError {
    /// Connection to the backend failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Operation timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for backend operations.
pub type SpeakResult<T> = Result<T, SpeakError>;

/// Connection state of a backend client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

// =============================================================================
// Configuration
// =============================================================================

/// Per-session synthesis request settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakOptions {
    /// Voice model (e.g. "aura-asteria-en")
    pub model: String,
    /// Output encoding, always linear16 for this relay
    pub encoding: String,
    /// Output sample rate in Hz, shared with the WAV header
    pub sample_rate: u32,
}

impl Default for SpeakOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            encoding: LINEAR16_ENCODING.to_string(),
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl SpeakOptions {
    /// Build options for a requested model, falling back to `default_model`
    /// when the request is absent or blank.
    pub fn resolve(requested: Option<&str>, default_model: &str, sample_rate: u32) -> Self {
        let model = requested
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(default_model);

        Self {
            model: model.to_string(),
            encoding: LINEAR16_ENCODING.to_string(),
            sample_rate,
        }
    }
}

// =============================================================================
// Traits
// =============================================================================

/// A connected (or connectable) streaming synthesis backend.
#[async_trait]
pub trait SpeakClient: Send {
    /// Open the backend connection. An `Open` event is delivered on success.
    async fn connect(&mut self) -> SpeakResult<()>;

    /// Queue text for synthesis.
    async fn speak(&mut self, text: &str) -> SpeakResult<()>;

    /// Ask the backend to synthesize everything queued so far.
    async fn flush(&mut self) -> SpeakResult<()>;

    /// Tear the connection down and close every event channel.
    async fn disconnect(&mut self) -> SpeakResult<()>;

    fn is_connected(&self) -> bool;
}

/// Boxed backend client as stored by a session.
pub type BoxedSpeakClient = Box<dyn SpeakClient>;

/// Builds one backend client per session.
pub trait SpeakClientFactory: Send + Sync {
    fn create(&self, options: SpeakOptions, events: EventSenders)
    -> SpeakResult<BoxedSpeakClient>;

    /// Provider name for logging.
    fn provider_name(&self) -> &'static str;
}
