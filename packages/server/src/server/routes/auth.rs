//! Phone login endpoints under `/api/auth`.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use twofactor::DeliveryChannel;

use crate::common::{LeadId, PropertyContext, UserId};
use crate::domains::auth::activities::{refresh_tokens, send_otp, verify_otp};
use crate::domains::auth::types::{SendOtpInput, VerifyOtpInput};
use crate::domains::auth::{AuthFlowError, TokenPair};
use crate::domains::user::activities::{update_watchlist, WatchlistChange};
use crate::domains::user::User;
use crate::server::app::AppState;
use crate::server::cookies::{cookie_value, REFRESH_TOKEN_COOKIE};
use crate::server::error::ApiError;
use crate::server::middleware::AuthUser;

// =============================================================================
// Request / response bodies
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    #[serde(default)]
    pub phone: String,
    pub name: Option<String>,
    pub city: Option<String>,
    pub property_id: Option<String>,
    pub property_name: Option<String>,
    pub property_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpResponse {
    pub success: bool,
    pub message: String,
    pub session_id: String,
    pub channel: DeliveryChannel,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub otp: String,
    pub name: Option<String>,
    pub city: Option<String>,
    pub property_id: Option<String>,
    pub property_name: Option<String>,
    pub property_url: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub phone: String,
    pub phone_number: String,
    pub city: String,
    pub email: Option<String>,
    pub is_returning: bool,
    pub is_new: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSummary {
    pub id: LeadId,
    pub property_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub success: bool,
    pub message: String,
    pub user: UserSummary,
    pub lead: Option<LeadSummary>,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: UserId,
    pub name: String,
    pub phone: String,
    pub phone_number: String,
    pub city: String,
    pub email: Option<String>,
    pub join_date: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    pub watchlist: Vec<String>,
    pub my_properties: Vec<String>,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            phone: user.phone,
            phone_number: user.phone_number,
            city: user.city,
            email: user.email,
            join_date: user.join_date,
            last_login: user.last_login,
            watchlist: user.watchlist,
            my_properties: user.my_properties,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub user: ProfileResponse,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/auth/send-otp
pub async fn send_otp_handler(
    Extension(state): Extension<AppState>,
    payload: Result<Json<SendOtpRequest>, JsonRejection>,
) -> Result<Json<SendOtpResponse>, ApiError> {
    let Json(body) = payload?;

    let input = SendOtpInput {
        phone: body.phone,
        name: body.name,
        city: body.city,
        property: PropertyContext::from_parts(
            body.property_id,
            body.property_name,
            body.property_url,
        ),
    };

    let sent = send_otp(input, &state.deps).await?;

    let message = match sent.channel {
        DeliveryChannel::Sms => "OTP sent successfully",
        DeliveryChannel::Voice => "OTP sent via voice call",
    };

    Ok(Json(SendOtpResponse {
        success: true,
        message: message.to_string(),
        session_id: sent.session_id,
        channel: sent.channel,
    }))
}

/// POST /api/auth/verify-otp
pub async fn verify_otp_handler(
    Extension(state): Extension<AppState>,
    jar: CookieJar,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;

    let input = VerifyOtpInput {
        session_id: body.session_id,
        otp: body.otp,
        name: body.name,
        city: body.city,
        property: PropertyContext::from_parts(
            body.property_id,
            body.property_name,
            body.property_url,
        ),
        source: body.source,
    };

    let verified = verify_otp(input, &state.deps).await?;
    let user = verified.user;

    let jar = state.cookies.with_session(
        jar,
        &TokenPair {
            access_token: verified.access_token.clone(),
            refresh_token: verified.refresh_token.clone(),
        },
        user.id,
    );

    let response = VerifyOtpResponse {
        success: true,
        message: "OTP verified successfully".to_string(),
        lead: verified.lead.map(|lead| LeadSummary {
            id: lead.id,
            property_name: lead.property_name,
        }),
        user: UserSummary {
            id: user.id,
            name: user.name,
            phone: user.phone,
            phone_number: user.phone_number,
            city: user.city,
            email: user.email,
            is_returning: !verified.is_new,
            is_new: verified.is_new,
        },
        token: verified.access_token,
        refresh_token: verified.refresh_token,
    };

    Ok((jar, Json(response)))
}

/// POST /api/auth/refresh
///
/// The refresh token comes from the `refreshToken` cookie, or the JSON body
/// for clients that don't keep cookies.
pub async fn refresh_handler(
    Extension(state): Extension<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let token = cookie_value(&jar, REFRESH_TOKEN_COOKIE)
        .or_else(|| body.and_then(|Json(body)| body.refresh_token))
        .ok_or(AuthFlowError::InvalidToken)?;

    let (user, tokens) = refresh_tokens(&token, &state.deps).await?;
    let jar = state.cookies.with_session(jar, &tokens, user.id);

    Ok((
        jar,
        Json(RefreshResponse {
            success: true,
            message: "Token refreshed".to_string(),
            token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }),
    ))
}

/// POST /api/auth/logout
pub async fn logout_handler(
    Extension(state): Extension<AppState>,
    jar: CookieJar,
) -> impl IntoResponse {
    (
        state.cookies.cleared(jar),
        Json(MessageResponse {
            success: true,
            message: "Logged out successfully".to_string(),
        }),
    )
}

/// GET /api/auth/me
pub async fn me_handler(
    Extension(state): Extension<AppState>,
    auth_user: Option<Extension<AuthUser>>,
) -> Result<Json<MeResponse>, ApiError> {
    let Extension(auth_user) = auth_user.ok_or_else(ApiError::unauthorized)?;

    let user = state
        .deps
        .users
        .find_by_id(auth_user.user_id)
        .await?
        .ok_or(AuthFlowError::UserNotFound)?;

    Ok(Json(MeResponse {
        success: true,
        user: user.into(),
    }))
}

/// POST /api/auth/me/watchlist/:property_id
pub async fn add_watchlist_handler(
    Extension(state): Extension<AppState>,
    auth_user: Option<Extension<AuthUser>>,
    Path(property_id): Path<String>,
) -> Result<Json<MeResponse>, ApiError> {
    change_watchlist(state, auth_user, &property_id, WatchlistChange::Add).await
}

/// DELETE /api/auth/me/watchlist/:property_id
pub async fn remove_watchlist_handler(
    Extension(state): Extension<AppState>,
    auth_user: Option<Extension<AuthUser>>,
    Path(property_id): Path<String>,
) -> Result<Json<MeResponse>, ApiError> {
    change_watchlist(state, auth_user, &property_id, WatchlistChange::Remove).await
}

async fn change_watchlist(
    state: AppState,
    auth_user: Option<Extension<AuthUser>>,
    property_id: &str,
    change: WatchlistChange,
) -> Result<Json<MeResponse>, ApiError> {
    let Extension(auth_user) = auth_user.ok_or_else(ApiError::unauthorized)?;
    if property_id.trim().is_empty() {
        return Err(ApiError::bad_request("Property ID is required"));
    }

    let user = update_watchlist(auth_user.user_id, property_id, change, state.deps.users.as_ref())
        .await?
        .ok_or(AuthFlowError::UserNotFound)?;

    info!(user_id = %user.id, ?change, "Watchlist updated");
    Ok(Json(MeResponse {
        success: true,
        user: user.into(),
    }))
}
