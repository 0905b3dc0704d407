use anyhow::{bail, Result};
use chrono::Duration;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::UserId;

/// Access tokens live for 15 minutes.
pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;

/// Refresh tokens live for 30 days.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    fn ttl(self) -> Duration {
        match self {
            TokenType::Access => Duration::minutes(ACCESS_TOKEN_TTL_MINUTES),
            TokenType::Refresh => Duration::days(REFRESH_TOKEN_TTL_DAYS),
        }
    }
}

/// JWT Claims - data stored in the token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,          // Subject (user_id as string)
    pub user_id: UserId,      // User UUID
    pub phone_number: String, // Phone number (for logging/debugging)
    pub token_type: TokenType,
    pub exp: i64, // Expiration timestamp
    pub iat: i64, // Issued at timestamp
    pub iss: String,
    pub jti: String, // Unique token identifier
}

/// Access + refresh token pair issued after a login.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// JWT Service - creates and verifies JWT tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtService {
    /// Create new JWT service with secret and issuer
    pub fn new(secret: &str, issuer: String) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }

    /// Issue an access token and a refresh token for the same user.
    pub fn issue_pair(&self, user_id: UserId, phone_number: &str) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.create_token(user_id, phone_number, TokenType::Access)?,
            refresh_token: self.create_token(user_id, phone_number, TokenType::Refresh)?,
        })
    }

    pub fn create_token(
        &self,
        user_id: UserId,
        phone_number: &str,
        token_type: TokenType,
    ) -> Result<String> {
        let now = chrono::Utc::now();
        let exp = now + token_type.ttl();

        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            phone_number: phone_number.to_string(),
            token_type,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Verify signature, expiry, issuer and token type.
    pub fn verify_token(&self, token: &str, expected: TokenType) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)?.claims;
        if claims.token_type != expected {
            bail!("expected {:?} token, got {:?}", expected, claims.token_type);
        }
        Ok(claims)
    }
}
