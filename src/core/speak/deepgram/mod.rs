//! Deepgram streaming text-to-speech backend.
//!
//! # Protocol
//!
//! - URL: `wss://api.deepgram.com/v1/speak?model=&encoding=&sample_rate=`
//! - Authentication: `Authorization: Token {api_key}` header
//! - Client → server: `{"type":"Speak","text":...}`, `{"type":"Flush"}`,
//!   `{"type":"Close"}`
//! - Server → client: binary audio frames, `Metadata`, `Flushed`, `Cleared`,
//!   `Warning` and `Error` JSON messages

mod client;
mod config;
pub mod messages;

pub use client::{DeepgramSpeak, DeepgramSpeakFactory};
pub use config::DeepgramSpeakConfig;
pub use messages::DEEPGRAM_SPEAK_URL;
