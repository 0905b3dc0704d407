use thiserror::Error;
use twofactor::GatewayError;

use crate::domains::auth::models::AttemptRefused;

/// Failures of the OTP login flow.
///
/// Session errors tell the client to request a new code; `InvalidCode`
/// tells it to retype.
#[derive(Error, Debug)]
pub enum AuthFlowError {
    #[error("{0}")]
    Validation(String),

    #[error("OTP session expired or invalid. Please request a new OTP.")]
    SessionNotFound,

    #[error("OTP session expired. Please request a new OTP.")]
    SessionExpired,

    #[error("Maximum attempts exceeded. Please request a new OTP.")]
    AttemptsExhausted,

    #[error("Invalid OTP. {remaining} attempt(s) remaining.")]
    InvalidCode { remaining: u32 },

    #[error("{0}")]
    Gateway(String),

    #[error("OTP service is not configured")]
    Configuration(String),

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<GatewayError> for AuthFlowError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::Configuration(reason) => AuthFlowError::Configuration(reason),
            other => AuthFlowError::Gateway(other.to_string()),
        }
    }
}

impl From<AttemptRefused> for AuthFlowError {
    fn from(refused: AttemptRefused) -> Self {
        match refused {
            AttemptRefused::NotFound => AuthFlowError::SessionNotFound,
            AttemptRefused::Expired => AuthFlowError::SessionExpired,
            AttemptRefused::Exhausted => AuthFlowError::AttemptsExhausted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_code_message_counts_down() {
        assert_eq!(
            AuthFlowError::InvalidCode { remaining: 2 }.to_string(),
            "Invalid OTP. 2 attempt(s) remaining."
        );
    }

    #[test]
    fn test_gateway_configuration_maps_to_configuration() {
        let error: AuthFlowError = GatewayError::Configuration("missing key".to_string()).into();
        assert!(matches!(error, AuthFlowError::Configuration(reason) if reason == "missing key"));
    }

    #[test]
    fn test_configuration_message_hides_details() {
        let error = AuthFlowError::Configuration("TWOFACTOR_API_KEY is not set".to_string());
        assert_eq!(error.to_string(), "OTP service is not configured");
    }
}
