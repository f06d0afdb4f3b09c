//! Wire messages for the Deepgram streaming speak WebSocket.
//!
//! Client → server messages are small tagged JSON objects. Server → client
//! traffic is either binary audio or a JSON object discriminated by `type`.

use serde::{Deserialize, Serialize};

use crate::core::speak::events::{
    ErrorResponse, FlushedResponse, MetadataResponse, WarningResponse,
};

/// Default Deepgram speak WebSocket endpoint.
pub const DEEPGRAM_SPEAK_URL: &str = "wss://api.deepgram.com/v1/speak";

// =============================================================================
// Client Messages
// =============================================================================

/// Control and text messages sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum SpeakClientMessage {
    /// Text to synthesize
    Speak { text: String },
    /// Synthesize everything queued so far
    Flush,
    /// Graceful close request
    Close,
}

impl SpeakClientMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// =============================================================================
// Server Messages
// =============================================================================

/// JSON messages received from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakServerMessage {
    Metadata(MetadataResponse),
    Flushed(FlushedResponse),
    Cleared { sequence_id: u64 },
    Warning(WarningResponse),
    Error(ErrorResponse),
    Unknown(String),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct ClearedBody {
    #[serde(default)]
    sequence_id: u64,
}

/// Parse a backend text frame by its `type` field.
pub fn parse_server_message(text: &str) -> Result<SpeakServerMessage, serde_json::Error> {
    let envelope: Envelope = serde_json::from_str(text)?;

    let message = match envelope.kind.as_str() {
        "Metadata" => SpeakServerMessage::Metadata(serde_json::from_str(text)?),
        "Flushed" => SpeakServerMessage::Flushed(serde_json::from_str(text)?),
        "Cleared" => {
            let body: ClearedBody = serde_json::from_str(text)?;
            SpeakServerMessage::Cleared {
                sequence_id: body.sequence_id,
            }
        }
        "Warning" => SpeakServerMessage::Warning(serde_json::from_str(text)?),
        "Error" => SpeakServerMessage::Error(serde_json::from_str(text)?),
        other => SpeakServerMessage::Unknown(other.to_string()),
    };

    Ok(message)
}
