//! Event relay from a synthesis backend to the client connection.
//!
//! - [`header`]: streaming WAV header and the re-send policy
//! - [`sink`]: outbound frames and the serialized client writer
//! - [`encoder`]: status event to text frame conversion
//! - [`engine`]: per-kind consumer tasks and their join

pub mod encoder;
pub mod engine;
pub mod header;
pub mod sink;

pub use encoder::{FrameEncoder, JsonFrameEncoder, StatusEvent, StatusPayload};
pub use engine::{ConsumerStats, RelayEngine, RelayStats};
pub use header::{DEFAULT_QUIET_INTERVAL, HeaderPolicy, WAV_HEADER_SIZE, WavHeader};
pub use sink::{FrameSink, OutboundFrame, RelayError, RelayResult, WsFrameSink};
