use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::common::UserId;

/// User model - SQL persistence layer
///
/// One row per verified phone number. `phone_number` is the international
/// form and is unique; `phone` keeps the local digits as entered.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub phone_number: String,
    pub phone: String,
    pub city: String,
    pub email: Option<String>,
    pub join_date: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    /// Saved property references.
    pub watchlist: Vec<String>,
    /// Properties this user listed.
    pub my_properties: Vec<String>,
}

/// Values for a first-time login.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub phone_number: String,
    pub phone: String,
    pub city: String,
}

/// Profile changes applied on a returning login. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginUpdate {
    pub name: Option<String>,
    pub city: Option<String>,
}

impl User {
    /// Find user by ID
    pub async fn find_by_id(id: UserId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Find user by international phone number
    pub async fn find_by_phone_number(phone_number: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE phone_number = $1")
            .bind(phone_number)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Insert new user
    ///
    /// Returns `None` when another request created the same phone number first.
    pub async fn insert(new: &NewUser, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO users (id, name, phone_number, phone, city)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (phone_number) DO NOTHING
             RETURNING *",
        )
        .bind(UserId::new())
        .bind(&new.name)
        .bind(&new.phone_number)
        .bind(&new.phone)
        .bind(&new.city)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Stamp a login and apply optional profile changes
    pub async fn record_login(id: UserId, update: &LoginUpdate, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE users
             SET last_login = NOW(),
                 name = COALESCE($2, name),
                 city = COALESCE($3, city)
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.city)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Add a property to the watchlist (no-op if already present)
    pub async fn add_to_watchlist(
        id: UserId,
        property_id: &str,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE users
             SET watchlist = CASE
                 WHEN $2 = ANY(watchlist) THEN watchlist
                 ELSE array_append(watchlist, $2)
             END
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(property_id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Remove a property from the watchlist
    pub async fn remove_from_watchlist(
        id: UserId,
        property_id: &str,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE users SET watchlist = array_remove(watchlist, $2) WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(property_id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }
}
