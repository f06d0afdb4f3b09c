//! Typed events produced by a speech-synthesis backend.
//!
//! A backend client never talks to the browser connection directly. It pushes
//! each occurrence onto one of five independent channels, one per event kind,
//! and the relay engine drains them. Dropping [`EventSenders`] closes every
//! channel at once, which is how session shutdown reaches the consumers.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Capacity of each event channel.
///
/// tokio has no zero-capacity channel; a single slot is the closest rendezvous
/// equivalent and keeps the backend reader paced by the consumers.
pub const EVENT_CHANNEL_CAPACITY: usize = 1;

// =============================================================================
// Event payloads
// =============================================================================

/// Emitted once the backend connection is established.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenResponse {
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for OpenResponse {
    fn default() -> Self {
        Self {
            kind: "Open".to_string(),
        }
    }
}

/// Acknowledgement that all text sent before a flush has been synthesized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushedResponse {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub sequence_id: u64,
}

impl FlushedResponse {
    pub fn new(sequence_id: u64) -> Self {
        Self {
            kind: "Flushed".to_string(),
            sequence_id,
        }
    }
}

/// Emitted when the backend connection has closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseResponse {
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for CloseResponse {
    fn default() -> Self {
        Self {
            kind: "Close".to_string(),
        }
    }
}

/// Error reported by the backend (or synthesized by the client on I/O failure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub err_code: String,
    #[serde(default)]
    pub err_msg: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl ErrorResponse {
    pub fn new(
        err_code: impl Into<String>,
        err_msg: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind: "Error".to_string(),
            err_code: err_code.into(),
            err_msg: err_msg.into(),
            description: description.into(),
            variant: None,
        }
    }
}

/// Model information sent by the backend after the first request.
///
/// Parsed and logged only; there is no client-facing consumer for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataResponse {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub model_version: String,
    #[serde(default)]
    pub model_uuid: String,
}

/// Non-fatal backend warning. Logged only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningResponse {
    #[serde(default)]
    pub warn_code: String,
    #[serde(default)]
    pub warn_msg: String,
}

/// Event kinds carried by the channel set, used for logging and stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Open,
    Audio,
    Flushed,
    Close,
    Error,
}

impl EventKind {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Audio => "audio",
            Self::Flushed => "flushed",
            Self::Close => "close",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Channel set
// =============================================================================

/// Producer half of the channel set, owned by the backend client.
#[derive(Debug, Clone)]
pub struct EventSenders {
    pub open: mpsc::Sender<OpenResponse>,
    pub audio: mpsc::Sender<Bytes>,
    pub flushed: mpsc::Sender<FlushedResponse>,
    pub close: mpsc::Sender<CloseResponse>,
    pub error: mpsc::Sender<ErrorResponse>,
}

/// Consumer half of the channel set, handed to the relay engine.
#[derive(Debug)]
pub struct EventReceivers {
    pub open: mpsc::Receiver<OpenResponse>,
    pub audio: mpsc::Receiver<Bytes>,
    pub flushed: mpsc::Receiver<FlushedResponse>,
    pub close: mpsc::Receiver<CloseResponse>,
    pub error: mpsc::Receiver<ErrorResponse>,
}

/// Create a fresh set of five event channels for one session.
pub fn event_channels() -> (EventSenders, EventReceivers) {
    let (open_tx, open_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (audio_tx, audio_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (flushed_tx, flushed_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (close_tx, close_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (error_tx, error_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

    (
        EventSenders {
            open: open_tx,
            audio: audio_tx,
            flushed: flushed_tx,
            close: close_tx,
            error: error_tx,
        },
        EventReceivers {
            open: open_rx,
            audio: audio_rx,
            flushed: flushed_rx,
            close: close_rx,
            error: error_rx,
        },
    )
}

impl EventSenders {
    /// Deliver an open event. A closed consumer is not an error for the producer.
    pub async fn send_open(&self, event: OpenResponse) {
        if self.open.send(event).await.is_err() {
            debug!("Open consumer gone, dropping event");
        }
    }

    pub async fn send_audio(&self, chunk: Bytes) {
        if self.audio.send(chunk).await.is_err() {
            debug!("Audio consumer gone, dropping chunk");
        }
    }

    pub async fn send_flushed(&self, event: FlushedResponse) {
        if self.flushed.send(event).await.is_err() {
            debug!("Flushed consumer gone, dropping event");
        }
    }

    pub async fn send_close(&self, event: CloseResponse) {
        if self.close.send(event).await.is_err() {
            debug!("Close consumer gone, dropping event");
        }
    }

    pub async fn send_error(&self, event: ErrorResponse) {
        if self.error.send(event).await.is_err() {
            debug!("Error consumer gone, dropping event");
        }
    }
}
