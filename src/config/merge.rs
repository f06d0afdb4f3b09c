use std::path::PathBuf;

use super::ServerConfig;
use super::yaml::YamlConfig;

/// Overlay every value present in `yaml` onto an environment-derived config.
pub(super) fn apply_yaml(config: &mut ServerConfig, yaml: YamlConfig) {
    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(dir) = server.static_dir {
            config.static_dir = PathBuf::from(dir);
        }
    }

    if let Some(deepgram) = yaml.deepgram {
        if deepgram.api_key.is_some() {
            config.deepgram_api_key = deepgram.api_key;
        }
        if let Some(url) = deepgram.speak_url {
            config.deepgram_speak_url = url;
        }
        if let Some(model) = deepgram.default_model {
            config.default_model = model;
        }
        if let Some(rate) = deepgram.sample_rate {
            config.sample_rate = rate;
        }
        if deepgram.connect_timeout_seconds.is_some() {
            config.connect_timeout_seconds = deepgram.connect_timeout_seconds;
        }
    }

    if let Some(relay) = yaml.relay
        && let Some(interval) = relay.header_quiet_interval_ms
    {
        config.header_quiet_interval_ms = interval;
    }

    if let Some(security) = yaml.security {
        if security.cors_allowed_origins.is_some() {
            config.cors_allowed_origins = security.cors_allowed_origins;
        }
        if security.max_websocket_connections.is_some() {
            config.max_websocket_connections = security.max_websocket_connections;
        }
        if let Some(limit) = security.max_connections_per_ip {
            config.max_connections_per_ip = limit;
        }
    }
}
