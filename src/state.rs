//! Shared application state for the relay server.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::config::ServerConfig;
use crate::core::speak::{DeepgramSpeakFactory, SpeakClientFactory};

/// Reasons a new WebSocket connection is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectionLimitError {
    #[error("global WebSocket connection limit reached")]
    GlobalLimitReached,
    #[error("per-IP WebSocket connection limit reached")]
    PerIpLimitReached,
}

#[derive(Debug, Default)]
struct ConnectionCounts {
    total: usize,
    per_ip: HashMap<IpAddr, u32>,
}

/// State shared by every request handler.
pub struct AppState {
    pub config: ServerConfig,
    /// Builds the backend client for each session
    pub speak_factory: Arc<dyn SpeakClientFactory>,
    connections: Mutex<ConnectionCounts>,
}

impl AppState {
    pub fn new(config: ServerConfig, speak_factory: Arc<dyn SpeakClientFactory>) -> Arc<Self> {
        Arc::new(Self {
            config,
            speak_factory,
            connections: Mutex::new(ConnectionCounts::default()),
        })
    }

    /// State backed by the Deepgram speak API, using the configured key and URL.
    pub fn with_deepgram(config: ServerConfig) -> Arc<Self> {
        let factory = DeepgramSpeakFactory::new(
            config.deepgram_api_key.clone().unwrap_or_default(),
            config.deepgram_speak_url.clone(),
            config.connect_timeout(),
        );
        Self::new(config, Arc::new(factory))
    }

    /// Reserve a WebSocket slot for `ip`, checking global then per-IP limits.
    pub fn try_acquire_connection(&self, ip: IpAddr) -> Result<(), ConnectionLimitError> {
        let mut counts = self.connections.lock();

        if let Some(max) = self.config.max_websocket_connections
            && counts.total >= max
        {
            return Err(ConnectionLimitError::GlobalLimitReached);
        }

        let per_ip = counts.per_ip.get(&ip).copied().unwrap_or(0);
        if per_ip >= self.config.max_connections_per_ip {
            return Err(ConnectionLimitError::PerIpLimitReached);
        }

        counts.total += 1;
        counts.per_ip.insert(ip, per_ip + 1);
        Ok(())
    }

    /// Return a slot taken by [`try_acquire_connection`](Self::try_acquire_connection).
    pub fn release_connection(&self, ip: IpAddr) {
        let mut counts = self.connections.lock();

        counts.total = counts.total.saturating_sub(1);
        if let Some(count) = counts.per_ip.get_mut(&ip) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.per_ip.remove(&ip);
            }
        }
    }

    pub fn ws_connection_count(&self) -> usize {
        self.connections.lock().total
    }

    pub fn ip_connection_count(&self, ip: &IpAddr) -> u32 {
        self.connections
            .lock()
            .per_ip
            .get(ip)
            .copied()
            .unwrap_or(0)
    }
}
