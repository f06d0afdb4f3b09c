//! Serialization of status events into client text frames.

use crate::core::speak::events::{
    CloseResponse, ErrorResponse, EventKind, FlushedResponse, OpenResponse,
};

use super::sink::{RelayError, RelayResult};

/// Borrowed view of a JSON-relayed event.
#[derive(Debug, Clone, Copy)]
pub enum StatusEvent<'a> {
    Open(&'a OpenResponse),
    Flushed(&'a FlushedResponse),
    Close(&'a CloseResponse),
    Error(&'a ErrorResponse),
}

impl StatusEvent<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Open(_) => EventKind::Open,
            Self::Flushed(_) => EventKind::Flushed,
            Self::Close(_) => EventKind::Close,
            Self::Error(_) => EventKind::Error,
        }
    }
}

/// Payloads that travel to the client as a JSON text frame.
pub trait StatusPayload: Send + 'static {
    fn as_status(&self) -> StatusEvent<'_>;
}

impl StatusPayload for OpenResponse {
    fn as_status(&self) -> StatusEvent<'_> {
        StatusEvent::Open(self)
    }
}

impl StatusPayload for FlushedResponse {
    fn as_status(&self) -> StatusEvent<'_> {
        StatusEvent::Flushed(self)
    }
}

impl StatusPayload for CloseResponse {
    fn as_status(&self) -> StatusEvent<'_> {
        StatusEvent::Close(self)
    }
}

impl StatusPayload for ErrorResponse {
    fn as_status(&self) -> StatusEvent<'_> {
        StatusEvent::Error(self)
    }
}

/// Turns a status event into the text of one client frame.
pub trait FrameEncoder: Send + Sync + 'static {
    fn encode_status(&self, event: StatusEvent<'_>) -> RelayResult<String>;
}

/// Encodes every status event as its JSON object, field names unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFrameEncoder;

impl FrameEncoder for JsonFrameEncoder {
    fn encode_status(&self, event: StatusEvent<'_>) -> RelayResult<String> {
        let encoded = match event {
            StatusEvent::Open(e) => serde_json::to_string(e),
            StatusEvent::Flushed(e) => serde_json::to_string(e),
            StatusEvent::Close(e) => serde_json::to_string(e),
            StatusEvent::Error(e) => serde_json::to_string(e),
        };
        encoded.map_err(|e| RelayError::EncodeFailed(format!("{} event: {e}", event.kind())))
    }
}
