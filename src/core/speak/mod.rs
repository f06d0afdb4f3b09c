//! Streaming speech-synthesis backends.
//!
//! A backend is consumed through two seams: the [`SpeakClient`] trait for
//! requests flowing towards it, and the five event channels in [`events`]
//! for everything flowing back.

mod base;
pub mod deepgram;
pub mod events;

pub use base::{
    BoxedSpeakClient, ConnectionState, DEFAULT_MODEL, DEFAULT_SAMPLE_RATE, LINEAR16_ENCODING,
    SpeakClient, SpeakClientFactory, SpeakError, SpeakOptions, SpeakResult,
};
pub use deepgram::{DEEPGRAM_SPEAK_URL, DeepgramSpeak, DeepgramSpeakConfig, DeepgramSpeakFactory};
pub use events::{
    CloseResponse, ErrorResponse, EventKind, EventReceivers, EventSenders, FlushedResponse,
    OpenResponse, event_channels,
};
