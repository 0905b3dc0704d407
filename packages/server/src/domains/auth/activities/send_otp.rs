//! Send OTP activity

use tracing::{error, info};
use twofactor::{format_for_api, format_for_storage, is_local_number};

use crate::common::non_blank;
use crate::domains::auth::errors::AuthFlowError;
use crate::domains::auth::models::OtpSession;
use crate::domains::auth::types::{OtpSent, SendOtpInput};
use crate::kernel::ServerDeps;

/// Send a code to a ten-digit phone number and open a session for it.
///
/// Nothing is stored unless the gateway accepted the request.
pub async fn send_otp(input: SendOtpInput, deps: &ServerDeps) -> Result<OtpSent, AuthFlowError> {
    let phone = input.phone.trim();
    if !is_local_number(phone) {
        return Err(AuthFlowError::Validation(
            "Please enter a valid 10-digit phone number".to_string(),
        ));
    }

    let dispatch = deps
        .otp_gateway
        .request_code(&format_for_api(phone))
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to send OTP");
            AuthFlowError::from(e)
        })?;

    let mut session = OtpSession::new(
        dispatch.session_id.clone(),
        format_for_storage(phone),
        phone.to_string(),
        dispatch.channel,
    );
    session.display_name = non_blank(input.name);
    session.city = non_blank(input.city);
    session.property = input.property;

    deps.otp_sessions.create(session).await;

    info!(channel = %dispatch.channel, "OTP sent");
    Ok(OtpSent {
        session_id: dispatch.session_id,
        channel: dispatch.channel,
    })
}
