// Infrastructure traits used by domain activities.
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (like "upsert the identity") lives in domain activities that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseOtpGateway, BaseUserRepository)

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use twofactor::{GatewayError, OtpDispatch};

use crate::common::UserId;
use crate::domains::auth::models::{AttemptRefused, OtpSession};
use crate::domains::leads::models::{Lead, NewLead};
use crate::domains::user::models::{LoginUpdate, NewUser, User};

// =============================================================================
// OTP Gateway Trait (Infrastructure - SMS/voice OTP)
// =============================================================================

#[async_trait]
pub trait BaseOtpGateway: Send + Sync {
    /// Send a code to `phone` (country-code form). SMS first, voice fallback.
    async fn request_code(&self, phone: &str) -> Result<OtpDispatch, GatewayError>;

    /// Check a code against a gateway session. Not retried.
    async fn verify_code(&self, session_id: &str, code: &str) -> Result<(), GatewayError>;
}

// =============================================================================
// OTP Session Store Trait
// =============================================================================

/// Pending OTP verifications keyed by gateway session id.
///
/// The in-process implementation is a locked map; a shared TTL store can
/// implement the same contract for multi-instance deployments.
#[async_trait]
pub trait BaseOtpSessionStore: Send + Sync {
    /// Insert (or overwrite) a session. Expired sessions are swept first.
    async fn create(&self, session: OtpSession);

    async fn get(&self, session_id: &str) -> Option<OtpSession>;

    /// Atomically bump the attempt counter and return the new value.
    async fn increment_attempts(&self, session_id: &str) -> Option<u32>;

    /// Reserve one verification attempt before the code is checked.
    ///
    /// Under the store's write lock: refuse (and remove) a session that is
    /// expired or already at the attempt limit, otherwise bump `attempts`
    /// and return the session as reserved. Concurrent callers can never be
    /// granted more than `MAX_VERIFY_ATTEMPTS` reservations in total.
    async fn begin_attempt(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<OtpSession, AttemptRefused>;

    /// Remove a session, returning it if this call removed it.
    async fn delete(&self, session_id: &str) -> Option<OtpSession>;

    /// Drop every session older than the TTL. Returns how many were removed.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> usize;

    /// Number of sessions currently held, expired or not.
    async fn count(&self) -> usize;
}

// =============================================================================
// Persistence Traits
// =============================================================================

#[async_trait]
pub trait BaseUserRepository: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;

    async fn find_by_phone_number(&self, phone_number: &str) -> Result<Option<User>>;

    /// Insert a user. Returns `None` if the phone number is already taken.
    async fn insert(&self, user: NewUser) -> Result<Option<User>>;

    /// Refresh `last_login` and apply any profile changes.
    async fn record_login(&self, id: UserId, update: LoginUpdate) -> Result<User>;

    async fn add_to_watchlist(&self, id: UserId, property_id: &str) -> Result<Option<User>>;

    async fn remove_from_watchlist(&self, id: UserId, property_id: &str) -> Result<Option<User>>;
}

#[async_trait]
pub trait BaseLeadRepository: Send + Sync {
    async fn insert(&self, lead: NewLead) -> Result<Lead>;
}
