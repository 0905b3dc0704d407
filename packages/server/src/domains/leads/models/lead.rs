use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use typed_builder::TypedBuilder;

use crate::common::{LeadId, PropertyContext, UserId};

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "lead_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Converted,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "lead_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// Timestamped annotation on a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadNote {
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl LeadNote {
    pub fn now(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// Lead
// ============================================================================

/// Sales lead captured from a verified contact.
///
/// This service only appends leads; the sales workflow owns every later
/// change to status, priority and notes.
#[derive(FromRow, Debug, Clone, Serialize)]
pub struct Lead {
    pub id: LeadId,
    pub user_id: Option<UserId>,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub city: String,
    pub property_id: Option<String>,
    pub property_name: Option<String>,
    pub property_url: Option<String>,
    pub source: String,
    pub status: LeadStatus,
    pub priority: LeadPriority,
    pub notes: Json<Vec<LeadNote>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct NewLead {
    #[builder(default)]
    pub user_id: Option<UserId>,
    pub name: String,
    pub phone: String,
    #[builder(default)]
    pub email: Option<String>,
    pub city: String,
    #[builder(default)]
    pub property: PropertyContext,
    pub source: String,
    #[builder(default)]
    pub status: LeadStatus,
    #[builder(default)]
    pub priority: LeadPriority,
    #[builder(default)]
    pub notes: Vec<LeadNote>,
}

impl Lead {
    /// Insert new lead
    pub async fn insert(new: NewLead, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO leads (
                id, user_id, name, phone, email, city,
                property_id, property_name, property_url,
                source, status, priority, notes
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING *",
        )
        .bind(LeadId::new())
        .bind(new.user_id)
        .bind(&new.name)
        .bind(&new.phone)
        .bind(&new.email)
        .bind(&new.city)
        .bind(&new.property.property_id)
        .bind(&new.property.property_name)
        .bind(&new.property.property_url)
        .bind(&new.source)
        .bind(new.status)
        .bind(new.priority)
        .bind(Json(&new.notes))
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Find leads for a raw phone number, newest first
    pub async fn find_by_phone(phone: &str, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM leads WHERE phone = $1 ORDER BY created_at DESC")
            .bind(phone)
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }
}
