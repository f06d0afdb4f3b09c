use url::Url;

use super::{ConfigError, ServerConfig};

/// linear16 sample rates accepted by the Deepgram speak endpoint.
pub const SUPPORTED_SAMPLE_RATES: [u32; 5] = [8000, 16000, 24000, 32000, 48000];

/// Validate a fully merged configuration.
pub(super) fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    validate_port(config.port)?;
    validate_sample_rate(config.sample_rate)?;
    validate_default_model(&config.default_model)?;
    validate_quiet_interval(config.header_quiet_interval_ms)?;
    validate_speak_url(&config.deepgram_speak_url)?;
    validate_connection_limits(config.max_websocket_connections, config.max_connections_per_ip)
}

fn validate_port(port: u16) -> Result<(), ConfigError> {
    if port == 0 {
        return Err(ConfigError::Invalid("port must be non-zero".to_string()));
    }
    Ok(())
}

fn validate_sample_rate(sample_rate: u32) -> Result<(), ConfigError> {
    if !SUPPORTED_SAMPLE_RATES.contains(&sample_rate) {
        return Err(ConfigError::Invalid(format!(
            "sample_rate {sample_rate} is not supported for linear16 (expected one of {SUPPORTED_SAMPLE_RATES:?})"
        )));
    }
    Ok(())
}

fn validate_default_model(model: &str) -> Result<(), ConfigError> {
    if model.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "default_model must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_quiet_interval(interval_ms: u64) -> Result<(), ConfigError> {
    if interval_ms == 0 {
        return Err(ConfigError::Invalid(
            "header_quiet_interval_ms must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_speak_url(speak_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(speak_url)
        .map_err(|e| ConfigError::Invalid(format!("Invalid speak URL '{speak_url}': {e}")))?;

    match url.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(ConfigError::Invalid(format!(
            "Speak URL must use ws:// or wss://, got {other}://"
        ))),
    }
}

fn validate_connection_limits(
    max_websocket_connections: Option<usize>,
    max_connections_per_ip: u32,
) -> Result<(), ConfigError> {
    if max_websocket_connections == Some(0) {
        return Err(ConfigError::Invalid(
            "max_websocket_connections must be greater than zero when set".to_string(),
        ));
    }
    if max_connections_per_ip == 0 {
        return Err(ConfigError::Invalid(
            "max_connections_per_ip must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
