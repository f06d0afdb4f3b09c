pub mod connection_limit;

// Re-export middleware functions
pub use connection_limit::{ClientIp, ConnectionGuard, connection_limit_middleware};
