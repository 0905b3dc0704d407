use std::fmt;

use serde::{Deserialize, Serialize};

/// Channel used to deliver a one-time code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    Sms,
    Voice,
}

impl DeliveryChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryChannel::Sms => "sms",
            DeliveryChannel::Voice => "voice",
        }
    }
}

impl fmt::Display for DeliveryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body returned by every gateway endpoint.
///
/// `Details` carries the session id on a successful send, and a
/// human-readable reason otherwise.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayResponse {
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Details", default)]
    pub details: String,
}

impl GatewayResponse {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }
}

/// A code that was handed to the gateway for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpDispatch {
    pub session_id: String,
    pub channel: DeliveryChannel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success_response() {
        let body: GatewayResponse =
            serde_json::from_str(r#"{"Status":"Success","Details":"abc-123"}"#).unwrap();
        assert!(body.is_success());
        assert_eq!(body.details, "abc-123");
    }

    #[test]
    fn test_parse_error_response_without_details() {
        let body: GatewayResponse = serde_json::from_str(r#"{"Status":"Error"}"#).unwrap();
        assert!(!body.is_success());
        assert!(body.details.is_empty());
    }

    #[test]
    fn test_channel_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&DeliveryChannel::Voice).unwrap(),
            "\"voice\""
        );
        assert_eq!(DeliveryChannel::Sms.to_string(), "sms");
    }
}
