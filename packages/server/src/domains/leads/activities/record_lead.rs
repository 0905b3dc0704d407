//! Record a lead for a verified login.

use anyhow::Result;
use tracing::info;
use twofactor::DeliveryChannel;

use crate::common::{non_blank, PropertyContext};
use crate::domains::leads::models::{Lead, LeadNote, NewLead};
use crate::domains::user::models::User;
use crate::kernel::BaseLeadRepository;

/// Source tag used when the client does not send one.
pub const LEAD_SOURCE_OTP: &str = "otp_verification";

/// Append one lead for `user`, who just verified `raw_phone` over `channel`.
pub async fn record_verification_lead(
    user: &User,
    raw_phone: &str,
    property: PropertyContext,
    source: Option<String>,
    channel: DeliveryChannel,
    leads: &dyn BaseLeadRepository,
) -> Result<Lead> {
    let lead = NewLead::builder()
        .user_id(Some(user.id))
        .name(user.name.clone())
        .phone(raw_phone)
        .email(user.email.clone())
        .city(user.city.clone())
        .property(property)
        .source(non_blank(source).unwrap_or_else(|| LEAD_SOURCE_OTP.to_string()))
        .notes(vec![LeadNote::now(format!(
            "Lead captured via OTP verification ({})",
            channel
        ))])
        .build();

    let lead = leads.insert(lead).await?;
    info!(lead_id = %lead.id, user_id = %user.id, "Recorded lead");
    Ok(lead)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::UserId;
    use crate::domains::leads::models::{LeadPriority, LeadStatus};
    use crate::kernel::test_dependencies::InMemoryLeadRepository;
    use chrono::Utc;

    fn user() -> User {
        User {
            id: UserId::new(),
            name: "Asha".to_string(),
            phone_number: "+919876543210".to_string(),
            phone: "9876543210".to_string(),
            city: "Pune".to_string(),
            email: Some("asha@example.com".to_string()),
            join_date: Utc::now(),
            last_login: Utc::now(),
            watchlist: vec![],
            my_properties: vec![],
        }
    }

    #[tokio::test]
    async fn test_lead_carries_identity_and_property() {
        let leads = InMemoryLeadRepository::new();
        let user = user();
        let property = PropertyContext::from_parts(
            Some("prop-1".to_string()),
            Some("Skyline Towers".to_string()),
            Some("https://example.com/p/1".to_string()),
        );

        let lead = record_verification_lead(
            &user,
            "9876543210",
            property.clone(),
            None,
            DeliveryChannel::Voice,
            &leads,
        )
        .await
        .unwrap();

        assert_eq!(lead.user_id, Some(user.id));
        assert_eq!(lead.name, "Asha");
        assert_eq!(lead.phone, "9876543210");
        assert_eq!(lead.email.as_deref(), Some("asha@example.com"));
        assert_eq!(lead.city, "Pune");
        assert_eq!(lead.property_id, property.property_id);
        assert_eq!(lead.property_name.as_deref(), Some("Skyline Towers"));
        assert_eq!(lead.source, LEAD_SOURCE_OTP);
        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.priority, LeadPriority::Medium);
        assert_eq!(lead.notes.0.len(), 1);
        assert!(lead.notes.0[0].text.contains("voice"));
        assert_eq!(leads.count(), 1);
    }

    #[tokio::test]
    async fn test_explicit_source_is_kept() {
        let leads = InMemoryLeadRepository::new();

        let lead = record_verification_lead(
            &user(),
            "9876543210",
            PropertyContext::default(),
            Some("property_page".to_string()),
            DeliveryChannel::Sms,
            &leads,
        )
        .await
        .unwrap();

        assert_eq!(lead.source, "property_page");
        assert_eq!(lead.property_id, None);
    }
}
