//! Backend capability and the relay engine.
//!
//! - [`speak`]: synthesis backend trait, event channels and the Deepgram client
//! - [`relay`]: drains a backend's events into the client connection

pub mod relay;
pub mod speak;

pub use relay::{FrameSink, OutboundFrame, RelayEngine, RelayError, RelayStats, WsFrameSink};
pub use speak::{
    DeepgramSpeak, DeepgramSpeakFactory, EventReceivers, EventSenders, SpeakClient,
    SpeakClientFactory, SpeakError, SpeakOptions, SpeakResult, event_channels,
};
