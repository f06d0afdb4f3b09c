//! Client-facing message types for the speak WebSocket.

use serde::{Deserialize, Serialize};

/// Inbound text frame: `{"text": "..."}`.
///
/// `text` is required; a frame without it is rejected at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SpeakRequest {
    pub text: String,
}

/// Query parameters of `GET /ws`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeakQuery {
    /// Voice model; the configured default is used when absent or empty
    pub model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_speak_request() {
        let req: SpeakRequest = serde_json::from_str(r#"{"text":"hello"}"#).unwrap();
        assert_eq!(req.text, "hello");
    }

    #[test]
    fn test_missing_text_is_rejected() {
        assert!(serde_json::from_str::<SpeakRequest>(r#"{"txt":"hi"}"#).is_err());
        assert!(serde_json::from_str::<SpeakRequest>("not json").is_err());
    }

    #[test]
    fn test_extra_fields_ignored() {
        let req: SpeakRequest =
            serde_json::from_str(r#"{"text":"hi","voice":"ignored"}"#).unwrap();
        assert_eq!(req.text, "hi");
    }
}
