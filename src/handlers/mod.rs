//! HTTP and WebSocket request handlers
//!
//! - `speak` - Text-to-speech relay WebSocket

pub mod speak;

pub use speak::speak_ws_handler;
