//! Outbound frames and the single-writer sink in front of the client socket.
//!
//! Five consumer tasks write to one browser connection. Every write goes
//! through [`FrameSink::write_frames`], which holds the writer lock for the
//! whole batch, so a frame is never split or interleaved and a WAV header is
//! always directly followed by its audio chunk.

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::extract::ws::Message;
use bytes::Bytes;
use futures::{Sink, SinkExt};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

/// Errors raised while relaying frames to the client.
#[derive(Debug, Error)]
pub enum RelayError {
    /// An event payload could not be turned into a frame
    #[error("Encode failed: {0}")]
    EncodeFailed(String),

    /// The client transport rejected a write
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// The sink was already closed
    #[error("Sink closed")]
    Closed,
}

pub type RelayResult<T> = Result<T, RelayError>;

/// A frame as written to the client connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// JSON status or error payload
    Text(String),
    /// WAV header or raw PCM audio
    Binary(Bytes),
}

impl From<OutboundFrame> for Message {
    fn from(frame: OutboundFrame) -> Self {
        match frame {
            OutboundFrame::Text(text) => Message::Text(text.into()),
            OutboundFrame::Binary(data) => Message::Binary(data),
        }
    }
}

/// Serialized writer shared by all relay consumers of one session.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Write `frames` back to back; no other writer's frame lands between them.
    async fn write_frames(&self, frames: Vec<OutboundFrame>) -> RelayResult<()>;

    async fn write_frame(&self, frame: OutboundFrame) -> RelayResult<()> {
        self.write_frames(vec![frame]).await
    }

    /// Close the underlying transport. Later writes fail with `Closed`.
    async fn close(&self) -> RelayResult<()>;
}

/// [`FrameSink`] over any WebSocket message sink, guarded by one async mutex.
pub struct WsFrameSink<S> {
    inner: Mutex<S>,
    closed: AtomicBool,
}

impl<S> WsFrameSink<S> {
    pub fn new(sink: S) -> Self {
        Self {
            inner: Mutex::new(sink),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl<S> FrameSink for WsFrameSink<S>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: Display,
{
    async fn write_frames(&self, frames: Vec<OutboundFrame>) -> RelayResult<()> {
        let mut sink = self.inner.lock().await;
        if self.is_closed() {
            return Err(RelayError::Closed);
        }

        for frame in frames {
            sink.send(frame.into())
                .await
                .map_err(|e| RelayError::WriteFailed(e.to_string()))?;
        }
        Ok(())
    }

    async fn close(&self) -> RelayResult<()> {
        let mut sink = self.inner.lock().await;
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        debug!("Closing client frame sink");
        // The peer may already be gone; a failed close frame is not an error here.
        let _ = sink.send(Message::Close(None)).await;
        sink.close()
            .await
            .map_err(|e| RelayError::WriteFailed(e.to_string()))
    }
}
