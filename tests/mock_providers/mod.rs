//! Mock backend servers for integration tests
//!
//! - `speak_mock`: Deepgram-style streaming speak WebSocket

// Not every test binary uses every helper.
#![allow(dead_code)]

pub mod speak_mock;

use std::net::TcpListener;

pub use speak_mock::{SpeakMockConfig, SpeakMockServer};

/// Find an available port for testing
pub fn find_available_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}
