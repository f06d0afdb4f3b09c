use std::path::PathBuf;
use std::str::FromStr;

use super::{ConfigError, ServerConfig};

/// Read a variable, treating unset and blank the same.
fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env_string(name) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { name, value }),
        None => Ok(None),
    }
}

/// Build a configuration from environment variables over the defaults.
pub(super) fn load_from_env() -> Result<ServerConfig, ConfigError> {
    let mut config = ServerConfig::default();

    if let Some(host) = env_string("HOST") {
        config.host = host;
    }
    if let Some(port) = env_parse("PORT")? {
        config.port = port;
    }
    if let Some(dir) = env_string("STATIC_DIR") {
        config.static_dir = PathBuf::from(dir);
    }

    config.deepgram_api_key = env_string("DEEPGRAM_API_KEY");
    if let Some(url) = env_string("DEEPGRAM_SPEAK_URL") {
        config.deepgram_speak_url = url;
    }
    config.connect_timeout_seconds = env_parse("DEEPGRAM_CONNECT_TIMEOUT_SECONDS")?;
    if let Some(model) = env_string("SPEAK_DEFAULT_MODEL") {
        config.default_model = model;
    }
    if let Some(rate) = env_parse("SPEAK_SAMPLE_RATE")? {
        config.sample_rate = rate;
    }

    if let Some(interval) = env_parse("HEADER_QUIET_INTERVAL_MS")? {
        config.header_quiet_interval_ms = interval;
    }

    config.cors_allowed_origins = env_string("CORS_ALLOWED_ORIGINS");
    config.max_websocket_connections = env_parse("MAX_WEBSOCKET_CONNECTIONS")?;
    if let Some(limit) = env_parse("MAX_CONNECTIONS_PER_IP")? {
        config.max_connections_per_ip = limit;
    }

    Ok(config)
}
