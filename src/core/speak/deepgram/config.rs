//! Configuration for the Deepgram speak WebSocket client.

use std::time::Duration;

use url::Url;
use zeroize::Zeroize;

use super::messages::DEEPGRAM_SPEAK_URL;
use crate::core::speak::base::{SpeakError, SpeakOptions, SpeakResult};

/// Connection settings for one Deepgram speak session.
#[derive(Debug, Clone)]
pub struct DeepgramSpeakConfig {
    /// Deepgram API key, sent as `Authorization: Token <key>`
    pub api_key: String,
    /// Base WebSocket URL (overridable for self-hosted or mock servers)
    pub speak_url: String,
    /// Model, encoding and sample rate for this session
    pub options: SpeakOptions,
    /// Upper bound on the WebSocket handshake. `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,
}

impl Default for DeepgramSpeakConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            speak_url: DEEPGRAM_SPEAK_URL.to_string(),
            options: SpeakOptions::default(),
            connect_timeout: None,
        }
    }
}

impl Drop for DeepgramSpeakConfig {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}

impl DeepgramSpeakConfig {
    pub fn new(api_key: impl Into<String>, options: SpeakOptions) -> Self {
        Self {
            api_key: api_key.into(),
            speak_url: DEEPGRAM_SPEAK_URL.to_string(),
            options,
            connect_timeout: None,
        }
    }

    pub fn with_speak_url(mut self, url: impl Into<String>) -> Self {
        self.speak_url = url.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Check the settings before a connection is attempted.
    pub fn validate(&self) -> SpeakResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(SpeakError::InvalidConfiguration(
                "Deepgram API key is required".to_string(),
            ));
        }
        if self.options.model.trim().is_empty() {
            return Err(SpeakError::InvalidConfiguration(
                "model must not be empty".to_string(),
            ));
        }
        self.build_websocket_url()?;
        Ok(())
    }

    /// Full WebSocket URL including the synthesis query parameters.
    pub fn build_websocket_url(&self) -> SpeakResult<Url> {
        let mut url = Url::parse(&self.speak_url).map_err(|e| {
            SpeakError::InvalidConfiguration(format!("Invalid speak URL '{}': {e}", self.speak_url))
        })?;

        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(SpeakError::InvalidConfiguration(format!(
                "Speak URL must use ws:// or wss://, got {}",
                url.scheme()
            )));
        }

        url.query_pairs_mut()
            .append_pair("model", &self.options.model)
            .append_pair("encoding", &self.options.encoding)
            .append_pair("sample_rate", &self.options.sample_rate.to_string());

        Ok(url)
    }
}
