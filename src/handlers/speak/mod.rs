//! Text-to-speech relay WebSocket
//!
//! # Protocol
//!
//! ## Client → Server
//!
//! - **Text frames**: `{"text": "..."}`. Each one is forwarded to the backend
//!   followed by a flush. Empty text and malformed JSON are logged and skipped.
//! - **Binary frames**: ignored
//!
//! ## Server → Client
//!
//! - **Text frames**: backend status objects (`Open`, `Flushed`, `Close`,
//!   `Error`) as received, one per frame
//! - **Binary frames**: a 44-byte WAV header before the first audio chunk and
//!   after every quiet gap, then the raw linear16 audio of each chunk

mod handler;
pub mod messages;
pub mod session;

pub use handler::speak_ws_handler;
pub use messages::{SpeakQuery, SpeakRequest};
pub use session::{Session, SessionEnd, SessionOutcome, SessionState};
