//! Refresh token exchange

use tracing::debug;

use crate::domains::auth::errors::AuthFlowError;
use crate::domains::auth::jwt::{TokenPair, TokenType};
use crate::domains::user::models::User;
use crate::kernel::ServerDeps;

/// Swap a valid refresh token for a fresh pair.
///
/// Tokens are stateless, so the only server-side check is that the user
/// still exists.
pub async fn refresh_tokens(
    refresh_token: &str,
    deps: &ServerDeps,
) -> Result<(User, TokenPair), AuthFlowError> {
    let claims = deps
        .jwt_service
        .verify_token(refresh_token, TokenType::Refresh)
        .map_err(|e| {
            debug!(error = %e, "Rejected refresh token");
            AuthFlowError::InvalidToken
        })?;

    let user = deps
        .users
        .find_by_id(claims.user_id)
        .await?
        .ok_or(AuthFlowError::UserNotFound)?;

    let tokens = deps.jwt_service.issue_pair(user.id, &user.phone_number)?;
    Ok((user, tokens))
}
