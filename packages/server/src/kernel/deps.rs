//! Server dependencies for activities (using traits for testability)
//!
//! This module provides the central dependency container used by all domain activities.
//! All external services use trait abstractions to enable testing.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use twofactor::{GatewayError, OtpDispatch, TwoFactorService};

use crate::common::UserId;
use crate::domains::auth::JwtService;
use crate::domains::leads::models::{Lead, NewLead};
use crate::domains::user::models::{LoginUpdate, NewUser, User};
use crate::kernel::{BaseLeadRepository, BaseOtpGateway, BaseOtpSessionStore, BaseUserRepository};

// =============================================================================
// TwoFactorService Adapter (implements BaseOtpGateway trait)
// =============================================================================

/// Wrapper around TwoFactorService that implements BaseOtpGateway trait
pub struct TwoFactorAdapter(pub Arc<TwoFactorService>);

impl TwoFactorAdapter {
    pub fn new(service: Arc<TwoFactorService>) -> Self {
        Self(service)
    }
}

#[async_trait]
impl BaseOtpGateway for TwoFactorAdapter {
    async fn request_code(&self, phone: &str) -> Result<OtpDispatch, GatewayError> {
        self.0.request_code(phone).await
    }

    async fn verify_code(&self, session_id: &str, code: &str) -> Result<(), GatewayError> {
        self.0.verify_code(session_id, code).await
    }
}

// =============================================================================
// Postgres repositories
// =============================================================================

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseUserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        User::find_by_id(id, &self.pool).await
    }

    async fn find_by_phone_number(&self, phone_number: &str) -> Result<Option<User>> {
        User::find_by_phone_number(phone_number, &self.pool).await
    }

    async fn insert(&self, user: NewUser) -> Result<Option<User>> {
        User::insert(&user, &self.pool).await
    }

    async fn record_login(&self, id: UserId, update: LoginUpdate) -> Result<User> {
        User::record_login(id, &update, &self.pool).await
    }

    async fn add_to_watchlist(&self, id: UserId, property_id: &str) -> Result<Option<User>> {
        User::add_to_watchlist(id, property_id, &self.pool).await
    }

    async fn remove_from_watchlist(&self, id: UserId, property_id: &str) -> Result<Option<User>> {
        User::remove_from_watchlist(id, property_id, &self.pool).await
    }
}

pub struct PostgresLeadRepository {
    pool: PgPool,
}

impl PostgresLeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseLeadRepository for PostgresLeadRepository {
    async fn insert(&self, lead: NewLead) -> Result<Lead> {
        Lead::insert(lead, &self.pool).await
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to activities (using traits for testability)
#[derive(Clone)]
pub struct ServerDeps {
    pub otp_gateway: Arc<dyn BaseOtpGateway>,
    pub otp_sessions: Arc<dyn BaseOtpSessionStore>,
    pub users: Arc<dyn BaseUserRepository>,
    pub leads: Arc<dyn BaseLeadRepository>,
    /// JWT service for token creation
    pub jwt_service: Arc<JwtService>,
    /// City assigned to new users who don't give one
    pub default_city: String,
}

impl ServerDeps {
    pub fn new(
        otp_gateway: Arc<dyn BaseOtpGateway>,
        otp_sessions: Arc<dyn BaseOtpSessionStore>,
        users: Arc<dyn BaseUserRepository>,
        leads: Arc<dyn BaseLeadRepository>,
        jwt_service: Arc<JwtService>,
        default_city: String,
    ) -> Self {
        Self {
            otp_gateway,
            otp_sessions,
            users,
            leads,
            jwt_service,
            default_city,
        }
    }
}
