//! Configuration module for the speak relay server
//!
//! Configuration comes from .env files, YAML files and environment variables.
//! Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `env`: Environment variable loading
//! - `yaml`: YAML configuration file loading
//! - `merge`: Applying YAML overrides on top of the environment
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use speak_relay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::speak::{DEEPGRAM_SPEAK_URL, DEFAULT_MODEL, DEFAULT_SAMPLE_RATE, SpeakOptions};

mod env;
mod merge;
mod validation;
mod yaml;

pub use validation::SUPPORTED_SAMPLE_RATES;
pub use yaml::YamlConfig;

/// Default port the relay listens on.
pub const DEFAULT_PORT: u16 = 3000;

/// Default directory served at `/`.
pub const DEFAULT_STATIC_DIR: &str = "./public";

/// Default quiet interval before a WAV header is re-sent, in milliseconds.
pub const DEFAULT_HEADER_QUIET_INTERVAL_MS: u64 = 3000;

/// Default per-IP WebSocket connection limit.
pub const DEFAULT_MAX_CONNECTIONS_PER_IP: u32 = 100;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration
///
/// Contains everything needed to run the relay:
/// - Listener settings (host, port, static directory)
/// - Deepgram speak backend settings (API key, URL, model, sample rate)
/// - Relay framing (WAV header quiet interval)
/// - Security settings (CORS, connection limits)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Directory served at the root path
    pub static_dir: PathBuf,

    // Deepgram speak backend
    pub deepgram_api_key: Option<String>,
    /// Speak WebSocket endpoint. Overridable for self-hosted deployments.
    pub deepgram_speak_url: String,
    /// Model used when the client omits `?model=`
    pub default_model: String,
    /// linear16 sample rate, shared by the backend request and the WAV header
    pub sample_rate: u32,
    /// Backend handshake timeout in seconds.
    /// Default: None (wait indefinitely)
    pub connect_timeout_seconds: Option<u64>,

    // Relay settings
    /// Gap between audio chunks after which a WAV header is re-sent
    /// Default: 3000
    pub header_quiet_interval_ms: u64,

    // Security settings
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (same-origin only)
    pub cors_allowed_origins: Option<String>,
    /// Maximum concurrent WebSocket connections
    /// Default: None (unlimited)
    pub max_websocket_connections: Option<usize>,
    /// Maximum connections per IP address
    /// Default: 100
    pub max_connections_per_ip: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            deepgram_api_key: None,
            deepgram_speak_url: DEEPGRAM_SPEAK_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            connect_timeout_seconds: None,
            header_quiet_interval_ms: DEFAULT_HEADER_QUIET_INTERVAL_MS,
            cors_allowed_origins: None,
            max_websocket_connections: None,
            max_connections_per_ip: DEFAULT_MAX_CONNECTIONS_PER_IP,
        }
    }
}

/// Zeroize the API key when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.deepgram_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables (with defaults).
    ///
    /// The .env file is loaded in `main` before this is called, so its values
    /// are visible here as ordinary environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = env::load_from_env()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let yaml_config = YamlConfig::from_file(path)?;

        let mut config = env::load_from_env()?;
        merge::apply_yaml(&mut config, yaml_config);

        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn has_deepgram_api_key(&self) -> bool {
        self.deepgram_api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    /// Synthesis options for a session that requested `model`.
    ///
    /// An absent or blank model falls back to `default_model`. Encoding is
    /// always linear16 and the sample rate always comes from this config, so
    /// the backend request and the relay's WAV header agree.
    pub fn speak_options(&self, model: Option<&str>) -> SpeakOptions {
        SpeakOptions::resolve(model, &self.default_model, self.sample_rate)
    }

    pub fn header_quiet_interval(&self) -> Duration {
        Duration::from_millis(self.header_quiet_interval_ms)
    }

    /// Backend handshake timeout. `None` means wait indefinitely.
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_seconds.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    // Helper to clean up environment variables
    fn cleanup_env_vars() {
        unsafe {
            env::remove_var("HOST");
            env::remove_var("PORT");
            env::remove_var("STATIC_DIR");
            env::remove_var("DEEPGRAM_API_KEY");
            env::remove_var("DEEPGRAM_SPEAK_URL");
            env::remove_var("DEEPGRAM_CONNECT_TIMEOUT_SECONDS");
            env::remove_var("SPEAK_DEFAULT_MODEL");
            env::remove_var("SPEAK_SAMPLE_RATE");
            env::remove_var("HEADER_QUIET_INTERVAL_MS");
            env::remove_var("CORS_ALLOWED_ORIGINS");
            env::remove_var("MAX_WEBSOCKET_CONNECTIONS");
            env::remove_var("MAX_CONNECTIONS_PER_IP");
        }
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.address(), "0.0.0.0:3000");
        assert_eq!(config.static_dir, PathBuf::from("./public"));
        assert_eq!(config.default_model, "aura-asteria-en");
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.header_quiet_interval(), Duration::from_secs(3));
        assert_eq!(config.connect_timeout(), None);
        assert!(!config.has_deepgram_api_key());
    }

    #[test]
    fn test_speak_options_default_model() {
        let config = ServerConfig::default();

        let options = config.speak_options(None);
        assert_eq!(options.model, "aura-asteria-en");
        assert_eq!(options.encoding, "linear16");
        assert_eq!(options.sample_rate, 48000);

        assert_eq!(config.speak_options(Some("")).model, "aura-asteria-en");
        assert_eq!(
            config.speak_options(Some("aura-orion-en")).model,
            "aura-orion-en"
        );
    }

    #[test]
    fn test_speak_options_follow_sample_rate() {
        let mut config = ServerConfig::default();
        config.sample_rate = 24000;
        config.default_model = "aura-luna-en".to_string();

        let options = config.speak_options(None);
        assert_eq!(options.sample_rate, 24000);
        assert_eq!(options.model, "aura-luna-en");
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        cleanup_env_vars();

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.deepgram_speak_url, "wss://api.deepgram.com/v1/speak");
        assert_eq!(config.max_connections_per_ip, 100);
        assert!(config.max_websocket_connections.is_none());

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        cleanup_env_vars();
        unsafe {
            env::set_var("PORT", "8080");
            env::set_var("DEEPGRAM_API_KEY", "env-key");
            env::set_var("SPEAK_SAMPLE_RATE", "16000");
            env::set_var("HEADER_QUIET_INTERVAL_MS", "1500");
            env::set_var("DEEPGRAM_CONNECT_TIMEOUT_SECONDS", "10");
            env::set_var("MAX_WEBSOCKET_CONNECTIONS", "50");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.deepgram_api_key.as_deref(), Some("env-key"));
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.header_quiet_interval(), Duration::from_millis(1500));
        assert_eq!(config.connect_timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.max_websocket_connections, Some(50));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_port() {
        cleanup_env_vars();
        unsafe {
            env::set_var("PORT", "not-a-port");
        }

        let result = ServerConfig::from_env();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnv { name: "PORT", .. })
        ));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_unsupported_sample_rate() {
        cleanup_env_vars();
        unsafe {
            env::set_var("SPEAK_SAMPLE_RATE", "44100");
        }

        let result = ServerConfig::from_env();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_only() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  host: "127.0.0.1"
  port: 8080
  static_dir: "/srv/relay"

deepgram:
  api_key: "yaml-dg-key"
  default_model: "aura-luna-en"
  sample_rate: 24000

relay:
  header_quiet_interval_ms: 2000
"#;

        fs::write(&config_path, yaml_content).unwrap();

        let config = ServerConfig::from_file(&config_path).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.static_dir, PathBuf::from("/srv/relay"));
        assert_eq!(config.deepgram_api_key, Some("yaml-dg-key".to_string()));
        assert_eq!(config.default_model, "aura-luna-en");
        assert_eq!(config.sample_rate, 24000);
        assert_eq!(config.header_quiet_interval_ms, 2000);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  host: "127.0.0.1"

deepgram:
  api_key: "yaml-key"
"#;

        fs::write(&config_path, yaml_content).unwrap();

        unsafe {
            env::set_var("HOST", "0.0.0.0");
            env::set_var("PORT", "4000");
            env::set_var("DEEPGRAM_API_KEY", "env-key");
        }

        let config = ServerConfig::from_file(&config_path).unwrap();

        // YAML overrides ENV
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.deepgram_api_key, Some("yaml-key".to_string()));
        // ENV value survives where YAML is silent
        assert_eq!(config.port, 4000);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();

        let config_path = PathBuf::from("/nonexistent/config.yaml");
        let result = ServerConfig::from_file(&config_path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_invalid_speak_url() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(
            &config_path,
            "deepgram:\n  speak_url: \"https://api.deepgram.com/v1/speak\"\n",
        )
        .unwrap();

        let result = ServerConfig::from_file(&config_path);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        cleanup_env_vars();
    }
}
