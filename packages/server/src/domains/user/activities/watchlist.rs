//! Watchlist bookkeeping for signed-in users.

use anyhow::{bail, Result};
use tracing::debug;

use crate::common::UserId;
use crate::domains::user::models::User;
use crate::kernel::BaseUserRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchlistChange {
    Add,
    Remove,
}

/// Add or remove a property reference. Adding twice keeps one entry.
///
/// Returns `None` if the user no longer exists.
pub async fn update_watchlist(
    user_id: UserId,
    property_id: &str,
    change: WatchlistChange,
    users: &dyn BaseUserRepository,
) -> Result<Option<User>> {
    let property_id = property_id.trim();
    if property_id.is_empty() {
        bail!("property id is required");
    }

    debug!(user_id = %user_id, property_id, ?change, "Updating watchlist");
    match change {
        WatchlistChange::Add => users.add_to_watchlist(user_id, property_id).await,
        WatchlistChange::Remove => users.remove_from_watchlist(user_id, property_id).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::user::models::NewUser;
    use crate::kernel::test_dependencies::InMemoryUserRepository;

    async fn seeded() -> (InMemoryUserRepository, UserId) {
        let users = InMemoryUserRepository::new();
        let user = users
            .insert(NewUser {
                name: "Asha".to_string(),
                phone_number: "+919876543210".to_string(),
                phone: "9876543210".to_string(),
                city: "Pune".to_string(),
            })
            .await
            .unwrap()
            .unwrap();
        (users, user.id)
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let (users, id) = seeded().await;

        update_watchlist(id, "prop-1", WatchlistChange::Add, &users)
            .await
            .unwrap();
        let user = update_watchlist(id, "prop-1", WatchlistChange::Add, &users)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(user.watchlist, vec!["prop-1".to_string()]);
    }

    #[tokio::test]
    async fn test_remove_drops_entry() {
        let (users, id) = seeded().await;
        update_watchlist(id, "prop-1", WatchlistChange::Add, &users)
            .await
            .unwrap();

        let user = update_watchlist(id, "prop-1", WatchlistChange::Remove, &users)
            .await
            .unwrap()
            .unwrap();

        assert!(user.watchlist.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_returns_none() {
        let users = InMemoryUserRepository::new();
        let result = update_watchlist(UserId::new(), "prop-1", WatchlistChange::Add, &users)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_blank_property_is_rejected() {
        let (users, id) = seeded().await;
        assert!(update_watchlist(id, "  ", WatchlistChange::Add, &users)
            .await
            .is_err());
    }
}
