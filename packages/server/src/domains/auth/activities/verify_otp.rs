//! Verify OTP activity
//!
//! Session states: awaiting code → verified | expired | attempts exhausted.
//! A session is single-use: after the gateway accepts the code the session
//! is claimed (removed) before any user or lead is written, so a replayed
//! or concurrent verify cannot log in twice.

use chrono::Utc;
use tracing::{error, info, warn};
use twofactor::GatewayError;

use crate::common::non_blank;
use crate::domains::auth::errors::AuthFlowError;
use crate::domains::auth::models::{OtpSession, MAX_VERIFY_ATTEMPTS};
use crate::domains::auth::types::{OtpVerified, VerifyOtpInput};
use crate::domains::leads::activities::record_verification_lead;
use crate::domains::user::activities::{upsert_identity, IdentityInput};
use crate::kernel::ServerDeps;

/// Verify a code, then upsert the user, record a lead and issue tokens.
pub async fn verify_otp(
    input: VerifyOtpInput,
    deps: &ServerDeps,
) -> Result<OtpVerified, AuthFlowError> {
    let session_id = input.session_id.trim().to_string();
    let code = input.otp.trim().to_string();

    if session_id.is_empty() {
        return Err(AuthFlowError::Validation("Session ID is required".to_string()));
    }
    if !is_well_formed_code(&code) {
        return Err(AuthFlowError::Validation(
            "Please enter a valid OTP".to_string(),
        ));
    }

    // The attempt is counted before the gateway sees the code, so requests
    // racing on one session cannot get more than MAX_VERIFY_ATTEMPTS guesses.
    let attempt = match deps.otp_sessions.begin_attempt(&session_id, Utc::now()).await {
        Ok(session) => session.attempts,
        Err(refused) => {
            info!(reason = %refused, "OTP session unusable");
            return Err(refused.into());
        }
    };

    if let Err(e) = deps.otp_gateway.verify_code(&session_id, &code).await {
        return Err(reject_attempt(&session_id, attempt, e, deps).await);
    }

    let Some(mut session) = deps.otp_sessions.delete(&session_id).await else {
        warn!("OTP session already consumed by another verification");
        return Err(AuthFlowError::SessionNotFound);
    };
    session.verified = true;

    complete_login(session, input, deps).await
}

/// Four to six ASCII digits.
fn is_well_formed_code(code: &str) -> bool {
    (4..=6).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_digit())
}

async fn reject_attempt(
    session_id: &str,
    attempts: u32,
    failure: GatewayError,
    deps: &ServerDeps,
) -> AuthFlowError {
    if let GatewayError::Configuration(reason) = &failure {
        error!(%reason, "OTP gateway is not configured");
        return failure.into();
    }

    if attempts >= MAX_VERIFY_ATTEMPTS {
        deps.otp_sessions.delete(session_id).await;
        warn!(attempts, "OTP session discarded after too many failed attempts");
        return AuthFlowError::AttemptsExhausted;
    }

    match failure {
        GatewayError::Rejected(reason) => {
            info!(attempts, %reason, "OTP rejected");
            AuthFlowError::InvalidCode {
                remaining: MAX_VERIFY_ATTEMPTS - attempts,
            }
        }
        other => {
            error!(error = %other, "OTP verification request failed");
            other.into()
        }
    }
}

async fn complete_login(
    session: OtpSession,
    input: VerifyOtpInput,
    deps: &ServerDeps,
) -> Result<OtpVerified, AuthFlowError> {
    let name = non_blank(input.name).or(session.display_name);
    let city = non_blank(input.city).or(session.city);
    let property = if input.property.is_empty() {
        session.property
    } else {
        input.property
    };

    let resolved = upsert_identity(
        IdentityInput {
            phone_number: session.phone_number.clone(),
            raw_phone: session.raw_phone.clone(),
            name,
            city,
        },
        &deps.default_city,
        deps.users.as_ref(),
    )
    .await?;

    // Losing a lead is acceptable; losing the login is not.
    let lead = match record_verification_lead(
        &resolved.user,
        &session.raw_phone,
        property,
        input.source,
        session.channel,
        deps.leads.as_ref(),
    )
    .await
    {
        Ok(lead) => Some(lead),
        Err(e) => {
            error!(error = %e, user_id = %resolved.user.id, "Failed to record lead");
            None
        }
    };

    let tokens = deps
        .jwt_service
        .issue_pair(resolved.user.id, &resolved.user.phone_number)?;

    info!(
        user_id = %resolved.user.id,
        is_new = resolved.is_new,
        "OTP verified"
    );

    Ok(OtpVerified {
        user: resolved.user,
        is_new: resolved.is_new,
        lead,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    })
}
