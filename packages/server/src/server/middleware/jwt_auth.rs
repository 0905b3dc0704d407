use crate::common::UserId;
use crate::domains::auth::{JwtService, TokenType};
use crate::server::cookies::{cookie_value, ACCESS_TOKEN_COOKIE};
use axum::{middleware::Next, response::Response};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::debug;

/// Authenticated user information from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: UserId,
    pub phone_number: String,
}

/// JWT authentication middleware
///
/// Extracts an access token from the Authorization header (or the `accessToken` cookie),
/// verifies it, and adds AuthUser to request extensions.
/// If no token or invalid token, request continues without AuthUser (public access).
pub async fn jwt_auth_middleware(
    jwt_service: Arc<JwtService>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let auth_user = extract_auth_user(&request, &jwt_service);

    if let Some(user) = auth_user {
        debug!("Authenticated user: {}", user.user_id);
        request.extensions_mut().insert(user);
    } else {
        debug!("No valid authentication token");
    }

    next.run(request).await
}

/// Extract and verify JWT token from request
fn extract_auth_user(
    request: &axum::http::Request<axum::body::Body>,
    jwt_service: &JwtService,
) -> Option<AuthUser> {
    let token = bearer_token(request).or_else(|| {
        let jar = CookieJar::from_headers(request.headers());
        cookie_value(&jar, ACCESS_TOKEN_COOKIE)
    })?;

    // Refresh tokens are only accepted by the refresh endpoint
    let claims = jwt_service.verify_token(&token, TokenType::Access).ok()?;

    Some(AuthUser {
        user_id: claims.user_id,
        phone_number: claims.phone_number,
    })
}

fn bearer_token(request: &axum::http::Request<axum::body::Body>) -> Option<String> {
    let auth_header = request.headers().get("authorization")?;
    let auth_str = auth_header.to_str().ok()?;

    // Handle both "Bearer <token>" and raw token
    Some(auth_str.strip_prefix("Bearer ").unwrap_or(auth_str).to_string())
}
