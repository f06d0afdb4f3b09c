//! Relay engine: drains the five event channels of one session into the
//! client connection.
//!
//! One consumer task per event kind. Each task owns its receiver and writes
//! through the shared [`FrameSink`], so frames of one kind keep their arrival
//! order while kinds progress independently. [`RelayEngine::run`] returns once
//! every channel is closed and every consumer has exited.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::core::speak::events::{EventKind, EventReceivers};

use super::encoder::{FrameEncoder, JsonFrameEncoder, StatusPayload};
use super::header::{DEFAULT_QUIET_INTERVAL, HeaderPolicy, WavHeader};
use super::sink::{FrameSink, OutboundFrame};

/// Counters reported by a single consumer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerStats {
    pub kind: EventKind,
    /// Events written to the client
    pub frames: u64,
    /// WAV headers written ahead of audio chunks (audio consumer only)
    pub headers: u64,
    /// Events dropped because they could not be encoded
    pub skipped: u64,
    /// Whether the consumer stopped on a write failure
    pub write_failed: bool,
}

impl ConsumerStats {
    fn new(kind: EventKind) -> Self {
        Self {
            kind,
            frames: 0,
            headers: 0,
            skipped: 0,
            write_failed: false,
        }
    }
}

/// Summary of one relay run, one entry per consumer that finished.
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    consumers: Vec<ConsumerStats>,
}

impl RelayStats {
    pub fn for_kind(&self, kind: EventKind) -> Option<&ConsumerStats> {
        self.consumers.iter().find(|c| c.kind == kind)
    }

    pub fn frames(&self, kind: EventKind) -> u64 {
        self.for_kind(kind).map_or(0, |c| c.frames)
    }

    pub fn headers(&self) -> u64 {
        self.frames_where(|c| c.headers)
    }

    pub fn skipped(&self) -> u64 {
        self.frames_where(|c| c.skipped)
    }

    pub fn total_frames(&self) -> u64 {
        self.frames_where(|c| c.frames)
    }

    pub fn write_failed(&self) -> bool {
        self.consumers.iter().any(|c| c.write_failed)
    }

    /// Number of consumers that exited normally or on a write failure.
    pub fn finished_consumers(&self) -> usize {
        self.consumers.len()
    }

    fn frames_where(&self, f: impl Fn(&ConsumerStats) -> u64) -> u64 {
        self.consumers.iter().map(f).sum()
    }
}

/// Per-session relay configuration.
pub struct RelayEngine<E = JsonFrameEncoder> {
    encoder: Arc<E>,
    header: Bytes,
    quiet_interval: Duration,
    shutdown: Option<CancellationToken>,
}

impl RelayEngine<JsonFrameEncoder> {
    /// Relay with JSON status frames and a mono 16-bit header at `sample_rate`.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            encoder: Arc::new(JsonFrameEncoder),
            header: Bytes::copy_from_slice(WavHeader::pcm16_mono(sample_rate).as_bytes()),
            quiet_interval: DEFAULT_QUIET_INTERVAL,
            shutdown: None,
        }
    }
}

impl<E: FrameEncoder> RelayEngine<E> {
    pub fn with_quiet_interval(mut self, quiet_interval: Duration) -> Self {
        self.quiet_interval = quiet_interval;
        self
    }

    /// Token cancelled when a client write fails, so the session can stop reading.
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    pub fn with_encoder<E2: FrameEncoder>(self, encoder: E2) -> RelayEngine<E2> {
        RelayEngine {
            encoder: Arc::new(encoder),
            header: self.header,
            quiet_interval: self.quiet_interval,
            shutdown: self.shutdown,
        }
    }

    /// Drain every channel into `sink` until all five are closed.
    pub async fn run<S>(self, receivers: EventReceivers, sink: Arc<S>) -> RelayStats
    where
        S: FrameSink + ?Sized + 'static,
    {
        let EventReceivers {
            open,
            audio,
            flushed,
            close,
            error,
        } = receivers;

        let mut tasks = JoinSet::new();

        tasks.spawn(relay_status(
            EventKind::Open,
            open,
            sink.clone(),
            self.encoder.clone(),
            self.shutdown.clone(),
        ));
        tasks.spawn(relay_audio(
            audio,
            sink.clone(),
            self.header.clone(),
            HeaderPolicy::new(self.quiet_interval),
            self.shutdown.clone(),
        ));
        tasks.spawn(relay_status(
            EventKind::Flushed,
            flushed,
            sink.clone(),
            self.encoder.clone(),
            self.shutdown.clone(),
        ));
        tasks.spawn(relay_status(
            EventKind::Close,
            close,
            sink.clone(),
            self.encoder.clone(),
            self.shutdown.clone(),
        ));
        tasks.spawn(relay_status(
            EventKind::Error,
            error,
            sink,
            self.encoder.clone(),
            self.shutdown.clone(),
        ));

        let mut stats = RelayStats::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(consumer) => {
                    debug!(
                        kind = %consumer.kind,
                        frames = consumer.frames,
                        "Relay consumer finished"
                    );
                    stats.consumers.push(consumer);
                }
                Err(e) => error!("Relay consumer task failed: {}", e),
            }
        }

        info!(
            frames = stats.total_frames(),
            headers = stats.headers(),
            skipped = stats.skipped(),
            "Relay finished"
        );
        stats
    }
}

fn signal_write_failure(shutdown: &Option<CancellationToken>) {
    if let Some(token) = shutdown {
        token.cancel();
    }
}

async fn relay_status<T, S, E>(
    kind: EventKind,
    mut rx: mpsc::Receiver<T>,
    sink: Arc<S>,
    encoder: Arc<E>,
    shutdown: Option<CancellationToken>,
) -> ConsumerStats
where
    T: StatusPayload,
    S: FrameSink + ?Sized,
    E: FrameEncoder,
{
    let mut stats = ConsumerStats::new(kind);

    while let Some(event) = rx.recv().await {
        let text = match encoder.encode_status(event.as_status()) {
            Ok(text) => text,
            Err(e) => {
                warn!(kind = %kind, "Skipping event that could not be encoded: {}", e);
                stats.skipped += 1;
                continue;
            }
        };

        debug!(kind = %kind, "Relaying {}", text);

        if let Err(e) = sink.write_frame(OutboundFrame::Text(text)).await {
            error!(kind = %kind, "Failed to write to client: {}", e);
            stats.write_failed = true;
            signal_write_failure(&shutdown);
            break;
        }
        stats.frames += 1;
    }

    stats
}

async fn relay_audio<S>(
    mut rx: mpsc::Receiver<Bytes>,
    sink: Arc<S>,
    header: Bytes,
    mut policy: HeaderPolicy,
    shutdown: Option<CancellationToken>,
) -> ConsumerStats
where
    S: FrameSink + ?Sized,
{
    let mut stats = ConsumerStats::new(EventKind::Audio);

    while let Some(chunk) = rx.recv().await {
        let with_header = policy.on_chunk(Instant::now());

        let mut frames = Vec::with_capacity(2);
        if with_header {
            debug!("Sending WAV header");
            frames.push(OutboundFrame::Binary(header.clone()));
        }
        trace!(bytes = chunk.len(), "Relaying audio chunk");
        frames.push(OutboundFrame::Binary(chunk));

        if let Err(e) = sink.write_frames(frames).await {
            error!(kind = %EventKind::Audio, "Failed to write to client: {}", e);
            stats.write_failed = true;
            signal_write_failure(&shutdown);
            break;
        }

        stats.frames += 1;
        if with_header {
            stats.headers += 1;
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::relay::sink::{RelayError, RelayResult};
    use crate::core::speak::events::{OpenResponse, event_channels};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        frames: Mutex<Vec<OutboundFrame>>,
    }

    #[async_trait]
    impl FrameSink for RecordingSink {
        async fn write_frames(&self, frames: Vec<OutboundFrame>) -> RelayResult<()> {
            self.frames.lock().extend(frames);
            Ok(())
        }

        async fn close(&self) -> RelayResult<()> {
            Ok(())
        }
    }

    struct BrokenSink;

    #[async_trait]
    impl FrameSink for BrokenSink {
        async fn write_frames(&self, _frames: Vec<OutboundFrame>) -> RelayResult<()> {
            Err(RelayError::WriteFailed("connection reset".into()))
        }

        async fn close(&self) -> RelayResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_returns_when_channels_close() {
        let (senders, receivers) = event_channels();
        let sink = Arc::new(RecordingSink::default());
        drop(senders);

        let stats = RelayEngine::new(48000).run(receivers, sink.clone()).await;

        assert_eq!(stats.finished_consumers(), 5);
        assert_eq!(stats.total_frames(), 0);
        assert!(sink.frames.lock().is_empty());
    }

    #[tokio::test]
    async fn test_open_event_becomes_text_frame() {
        let (senders, receivers) = event_channels();
        let sink = Arc::new(RecordingSink::default());
        let relay = tokio::spawn(RelayEngine::new(48000).run(receivers, sink.clone()));

        senders.send_open(OpenResponse::default()).await;
        drop(senders);
        let stats = relay.await.unwrap();

        assert_eq!(stats.frames(EventKind::Open), 1);
        assert_eq!(
            sink.frames.lock().as_slice(),
            &[OutboundFrame::Text(r#"{"type":"Open"}"#.to_string())]
        );
    }

    #[tokio::test]
    async fn test_header_precedes_first_chunk() {
        let (senders, receivers) = event_channels();
        let sink = Arc::new(RecordingSink::default());
        let relay = tokio::spawn(RelayEngine::new(16000).run(receivers, sink.clone()));

        senders.send_audio(Bytes::from_static(&[1, 2, 3, 4])).await;
        drop(senders);
        let stats = relay.await.unwrap();

        let frames = sink.frames.lock();
        assert_eq!(frames.len(), 2);
        assert_eq!(
            frames[0],
            OutboundFrame::Binary(Bytes::copy_from_slice(
                WavHeader::pcm16_mono(16000).as_bytes()
            ))
        );
        assert_eq!(frames[1], OutboundFrame::Binary(Bytes::from_static(&[1, 2, 3, 4])));
        assert_eq!(stats.headers(), 1);
    }

    #[tokio::test]
    async fn test_write_failure_cancels_token() {
        let (senders, receivers) = event_channels();
        let token = CancellationToken::new();
        let engine = RelayEngine::new(48000).with_shutdown_token(token.clone());
        let relay = tokio::spawn(engine.run(receivers, Arc::new(BrokenSink)));

        senders.send_open(OpenResponse::default()).await;
        token.cancelled().await;
        drop(senders);

        let stats = relay.await.unwrap();
        assert!(stats.write_failed());
        assert_eq!(stats.frames(EventKind::Open), 0);
    }
}
