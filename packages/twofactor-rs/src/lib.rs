//! Client for the 2Factor one-time password API.
//!
//! Codes are sent over SMS first and fall back to a voice call once if
//! SMS delivery fails. Verification is a single call with no retry: the
//! gateway consumes codes, so retrying can invalidate a correct one.

use std::time::Duration;

pub mod models;
pub mod phone;

use reqwest::Client;
use tracing::{debug, warn};

pub use models::{DeliveryChannel, GatewayResponse, OtpDispatch};
pub use phone::{format_for_api, format_for_storage, is_local_number, COUNTRY_CODE};

pub const DEFAULT_BASE_URL: &str = "https://2factor.in/API/V1";
pub const DEFAULT_TEMPLATE: &str = "OTP1";

/// Channels tried by [`TwoFactorService::request_code`], in order.
pub const DELIVERY_STRATEGY: [DeliveryChannel; 2] = [DeliveryChannel::Sms, DeliveryChannel::Voice];

#[derive(Debug, Clone)]
pub struct TwoFactorOptions {
    pub api_key: Option<String>,
    pub base_url: String,
    pub template: String,
    pub sms_timeout: Duration,
    pub voice_timeout: Duration,
    pub verify_timeout: Duration,
}

impl TwoFactorOptions {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            template: DEFAULT_TEMPLATE.to_string(),
            sms_timeout: Duration::from_secs(10),
            voice_timeout: Duration::from_secs(15),
            verify_timeout: Duration::from_secs(10),
        }
    }

    fn timeout_for(&self, channel: DeliveryChannel) -> Duration {
        match channel {
            DeliveryChannel::Sms => self.sms_timeout,
            DeliveryChannel::Voice => self.voice_timeout,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Credentials are missing or unusable. Not retried.
    #[error("OTP gateway misconfigured: {0}")]
    Configuration(String),

    /// Every delivery channel failed.
    #[error("Failed to send OTP: {}", describe_failures(.failures))]
    AllChannelsFailed {
        failures: Vec<(DeliveryChannel, String)>,
    },

    /// The gateway explicitly rejected the code.
    #[error("OTP rejected: {0}")]
    Rejected(String),

    /// Network failure, timeout, or an unusable response.
    #[error("OTP gateway request failed: {0}")]
    Transport(String),
}

fn describe_failures(failures: &[(DeliveryChannel, String)]) -> String {
    failures
        .iter()
        .map(|(channel, reason)| format!("{} failed ({})", channel.as_str().to_uppercase(), reason))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone)]
pub struct TwoFactorService {
    options: TwoFactorOptions,
    client: Client,
}

impl TwoFactorService {
    pub fn new(options: TwoFactorOptions) -> Self {
        Self {
            options,
            client: Client::new(),
        }
    }

    fn api_key(&self) -> Result<&str, GatewayError> {
        let key = self.options.api_key.as_deref().map(str::trim).unwrap_or_default();
        if key.is_empty() {
            return Err(GatewayError::Configuration(
                "TWOFACTOR_API_KEY is not set".to_string(),
            ));
        }
        if key.contains('/') || key.chars().any(char::is_whitespace) {
            return Err(GatewayError::Configuration(
                "TWOFACTOR_API_KEY is malformed".to_string(),
            ));
        }
        Ok(key)
    }

    /// Originate a code for `phone` (country-code form, see [`format_for_api`]).
    ///
    /// Walks [`DELIVERY_STRATEGY`] and returns on the first channel that
    /// yields a session id.
    pub async fn request_code(&self, phone: &str) -> Result<OtpDispatch, GatewayError> {
        let api_key = self.api_key()?;
        let mut failures = Vec::with_capacity(DELIVERY_STRATEGY.len());

        for channel in DELIVERY_STRATEGY {
            match self.dispatch(api_key, phone, channel).await {
                Ok(session_id) => {
                    if !failures.is_empty() {
                        debug!(%channel, "OTP delivered after fallback");
                    }
                    return Ok(OtpDispatch {
                        session_id,
                        channel,
                    });
                }
                Err(reason) => {
                    warn!(%channel, %reason, "OTP delivery attempt failed");
                    failures.push((channel, reason));
                }
            }
        }

        Err(GatewayError::AllChannelsFailed { failures })
    }

    async fn dispatch(
        &self,
        api_key: &str,
        phone: &str,
        channel: DeliveryChannel,
    ) -> Result<String, String> {
        let base = self.options.base_url.trim_end_matches('/');
        let url = match channel {
            DeliveryChannel::Sms => format!(
                "{base}/{api_key}/SMS/{phone}/AUTOGEN/{template}",
                template = self.options.template
            ),
            DeliveryChannel::Voice => format!("{base}/{api_key}/VOICE/{phone}/AUTOGEN"),
        };

        let response = self
            .client
            .get(url)
            .timeout(self.options.timeout_for(channel))
            .send()
            .await
            .map_err(describe_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {}: {}", status.as_u16(), body.trim()));
        }

        let body = response
            .json::<GatewayResponse>()
            .await
            .map_err(|e| format!("malformed response: {}", e.without_url()))?;

        if !body.is_success() {
            return Err(non_empty(body.details, "gateway reported an error"));
        }
        if body.details.trim().is_empty() {
            return Err("response carried no session id".to_string());
        }
        Ok(body.details)
    }

    /// Check `code` against the gateway session. Never retried.
    pub async fn verify_code(&self, session_id: &str, code: &str) -> Result<(), GatewayError> {
        let api_key = self.api_key()?;
        let base = self.options.base_url.trim_end_matches('/');
        let url = format!("{base}/{api_key}/SMS/VERIFY/{session_id}/{code}");

        let response = self
            .client
            .get(url)
            .timeout(self.options.verify_timeout)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(describe_request_error(e)))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(GatewayError::Transport(format!("HTTP {}", status.as_u16())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(describe_request_error(e)))?;

        match serde_json::from_str::<GatewayResponse>(&body) {
            Ok(parsed) if parsed.is_success() => Ok(()),
            Ok(parsed) => Err(GatewayError::Rejected(non_empty(
                parsed.details,
                "code did not match",
            ))),
            Err(e) => Err(GatewayError::Transport(format!(
                "HTTP {}: malformed response: {}",
                status.as_u16(),
                e
            ))),
        }
    }
}

// reqwest errors embed the request URL, which contains the API key.
fn describe_request_error(error: reqwest::Error) -> String {
    if error.is_timeout() {
        "request timed out".to_string()
    } else {
        error.without_url().to_string()
    }
}

fn non_empty(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let options = TwoFactorOptions::new(None);
        assert_eq!(options.sms_timeout, Duration::from_secs(10));
        assert_eq!(options.voice_timeout, Duration::from_secs(15));
        assert_eq!(options.verify_timeout, Duration::from_secs(10));
        assert_eq!(options.timeout_for(DeliveryChannel::Voice), options.voice_timeout);
    }

    #[test]
    fn test_failures_are_listed_in_order() {
        let error = GatewayError::AllChannelsFailed {
            failures: vec![
                (DeliveryChannel::Sms, "HTTP 500: down".to_string()),
                (DeliveryChannel::Voice, "request timed out".to_string()),
            ],
        };
        assert_eq!(
            error.to_string(),
            "Failed to send OTP: SMS failed (HTTP 500: down); VOICE failed (request timed out)"
        );
    }

    #[tokio::test]
    async fn test_missing_api_key_is_configuration_error() {
        let service = TwoFactorService::new(TwoFactorOptions::new(None));
        let result = service.request_code("919876543210").await;
        assert!(matches!(result, Err(GatewayError::Configuration(_))));

        let service = TwoFactorService::new(TwoFactorOptions::new(Some("  ".to_string())));
        let result = service.verify_code("session", "123456").await;
        assert!(matches!(result, Err(GatewayError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_malformed_api_key_is_configuration_error() {
        let service =
            TwoFactorService::new(TwoFactorOptions::new(Some("abc/def".to_string())));
        let result = service.request_code("919876543210").await;
        match result {
            Err(GatewayError::Configuration(message)) => assert!(message.contains("malformed")),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }
}
