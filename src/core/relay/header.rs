//! WAV container header and the policy deciding when to re-send it.
//!
//! Browsers and media players can only start decoding a raw PCM stream once
//! they have seen a container header. The stream length is unknown up front,
//! so the RIFF and data size fields are left at zero; players that accept
//! streaming WAV ignore them.

use std::time::Duration;

use tokio::time::Instant;

/// Size of a canonical PCM WAV header.
pub const WAV_HEADER_SIZE: usize = 44;

/// Quiet interval after which a fresh header precedes the next chunk.
pub const DEFAULT_QUIET_INTERVAL: Duration = Duration::from_secs(3);

/// Fixed 44-byte streaming WAV header for 16-bit PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    bytes: [u8; WAV_HEADER_SIZE],
}

impl WavHeader {
    /// Mono 16-bit PCM header at the given sample rate.
    pub fn pcm16_mono(sample_rate: u32) -> Self {
        Self::pcm16(sample_rate, 1)
    }

    pub fn pcm16(sample_rate: u32, channels: u16) -> Self {
        let bits_per_sample: u16 = 16;
        let block_align = channels * bits_per_sample / 8;
        let byte_rate = sample_rate * u32::from(block_align);

        let mut bytes = [0u8; WAV_HEADER_SIZE];
        bytes[0..4].copy_from_slice(b"RIFF");
        // bytes[4..8]: RIFF chunk size, unknown for a stream
        bytes[8..12].copy_from_slice(b"WAVE");
        bytes[12..16].copy_from_slice(b"fmt ");
        bytes[16..20].copy_from_slice(&16u32.to_le_bytes());
        bytes[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
        bytes[22..24].copy_from_slice(&channels.to_le_bytes());
        bytes[24..28].copy_from_slice(&sample_rate.to_le_bytes());
        bytes[28..32].copy_from_slice(&byte_rate.to_le_bytes());
        bytes[32..34].copy_from_slice(&block_align.to_le_bytes());
        bytes[34..36].copy_from_slice(&bits_per_sample.to_le_bytes());
        bytes[36..40].copy_from_slice(b"data");
        // bytes[40..44]: data chunk size, unknown for a stream

        Self { bytes }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; WAV_HEADER_SIZE] {
        &self.bytes
    }

    pub fn sample_rate(&self) -> u32 {
        u32::from_le_bytes([self.bytes[24], self.bytes[25], self.bytes[26], self.bytes[27]])
    }
}

/// Decides whether an audio chunk must be preceded by a header.
///
/// Owned by the audio consumer task alone, so it needs no locking. The clock
/// is the last audio write: a header is due on the first chunk and after any
/// gap of at least `quiet_interval` between chunks.
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    quiet_interval: Duration,
    last_write: Option<Instant>,
}

impl Default for HeaderPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_INTERVAL)
    }
}

impl HeaderPolicy {
    pub fn new(quiet_interval: Duration) -> Self {
        Self {
            quiet_interval,
            last_write: None,
        }
    }

    pub fn quiet_interval(&self) -> Duration {
        self.quiet_interval
    }

    /// Whether a header must go out before a chunk written at `now`.
    pub fn header_due(&self, now: Instant) -> bool {
        match self.last_write {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.quiet_interval,
        }
    }

    /// Record that a chunk was written at `now`.
    pub fn record_write(&mut self, now: Instant) {
        self.last_write = Some(now);
    }

    /// `header_due` followed by `record_write`, for the common path.
    pub fn on_chunk(&mut self, now: Instant) -> bool {
        let due = self.header_due(now);
        self.record_write(now);
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout_48k() {
        let header = WavHeader::pcm16_mono(48000);
        let expected: [u8; WAV_HEADER_SIZE] = [
            0x52, 0x49, 0x46, 0x46, // RIFF
            0x00, 0x00, 0x00, 0x00, // size placeholder
            0x57, 0x41, 0x56, 0x45, // WAVE
            0x66, 0x6d, 0x74, 0x20, // fmt
            0x10, 0x00, 0x00, 0x00, // 16
            0x01, 0x00, // PCM
            0x01, 0x00, // mono
            0x80, 0xbb, 0x00, 0x00, // 48000
            0x00, 0x77, 0x01, 0x00, // 96000
            0x02, 0x00, // block align
            0x10, 0x00, // 16 bits
            0x64, 0x61, 0x74, 0x61, // data
            0x00, 0x00, 0x00, 0x00, // size placeholder
        ];
        assert_eq!(header.as_bytes(), &expected);
        assert_eq!(header.sample_rate(), 48000);
    }

    #[test]
    fn test_byte_rate_follows_sample_rate() {
        let header = WavHeader::pcm16_mono(24000);
        let bytes = header.as_bytes();
        assert_eq!(u32::from_le_bytes(bytes[24..28].try_into().unwrap()), 24000);
        assert_eq!(u32::from_le_bytes(bytes[28..32].try_into().unwrap()), 48000);
    }

    #[test]
    fn test_first_chunk_gets_header() {
        let mut policy = HeaderPolicy::default();
        assert!(policy.on_chunk(Instant::now()));
    }

    #[test]
    fn test_short_gaps_do_not_repeat_header() {
        let mut policy = HeaderPolicy::default();
        let start = Instant::now();

        assert!(policy.on_chunk(start));
        for i in 1..=20u64 {
            assert!(!policy.on_chunk(start + Duration::from_millis(2900 * i)));
        }
    }

    #[test]
    fn test_gap_at_threshold_repeats_header() {
        let mut policy = HeaderPolicy::default();
        let start = Instant::now();

        assert!(policy.on_chunk(start));
        assert!(policy.on_chunk(start + Duration::from_secs(3)));
        assert!(!policy.on_chunk(start + Duration::from_secs(4)));
        assert!(policy.on_chunk(start + Duration::from_secs(10)));
    }

    #[test]
    fn test_header_due_does_not_mutate() {
        let policy = HeaderPolicy::new(Duration::from_millis(500));
        let now = Instant::now();
        assert!(policy.header_due(now));
        assert!(policy.header_due(now));
        assert_eq!(policy.quiet_interval(), Duration::from_millis(500));
    }
}
