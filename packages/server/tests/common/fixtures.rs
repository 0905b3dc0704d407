//! Test fixtures for creating test data.
//!
//! These fixtures use the model methods directly to create test data.

use anyhow::{Context, Result};
use estate_core::domains::user::models::{NewUser, User};
use sqlx::PgPool;
use uuid::Uuid;

/// A ten-digit local number nobody else in the shared database has.
pub fn unique_local_phone() -> String {
    let n = Uuid::new_v4().as_u128() % 1_000_000_000;
    format!("9{:09}", n)
}

/// Create a user for `local_phone` the way a first login would.
pub async fn create_test_user(pool: &PgPool, local_phone: &str) -> Result<User> {
    User::insert(
        &NewUser {
            name: "Test User".to_string(),
            phone_number: format!("+91{}", local_phone),
            phone: local_phone.to_string(),
            city: "Delhi".to_string(),
        },
        pool,
    )
    .await?
    .context("phone number already taken")
}
