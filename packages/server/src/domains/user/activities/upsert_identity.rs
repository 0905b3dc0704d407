//! Find-or-create a user after a successful phone verification.

use anyhow::{Context, Result};
use tracing::info;

use crate::common::non_blank;
use crate::domains::user::models::{LoginUpdate, NewUser, User};
use crate::kernel::BaseUserRepository;

/// Name given to users who never supplied one.
pub const DEFAULT_USER_NAME: &str = "User";

/// Who just proved possession of a phone number.
#[derive(Debug, Clone)]
pub struct IdentityInput {
    /// International form (`+91…`).
    pub phone_number: String,
    /// Local digits as entered.
    pub raw_phone: String,
    pub name: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub user: User,
    pub is_new: bool,
}

/// Look the user up by phone number, creating them on first login.
///
/// Returning users keep their stored name and city unless a non-default,
/// different value was supplied. `last_login` is always refreshed.
pub async fn upsert_identity(
    input: IdentityInput,
    default_city: &str,
    users: &dyn BaseUserRepository,
) -> Result<ResolvedIdentity> {
    let name = non_blank(input.name);
    let city = non_blank(input.city);

    if let Some(existing) = users.find_by_phone_number(&input.phone_number).await? {
        let user = refresh_login(existing, name, city, default_city, users).await?;
        return Ok(ResolvedIdentity {
            user,
            is_new: false,
        });
    }

    let new_user = NewUser {
        name: name.clone().unwrap_or_else(|| DEFAULT_USER_NAME.to_string()),
        phone_number: input.phone_number.clone(),
        phone: input.raw_phone,
        city: city.clone().unwrap_or_else(|| default_city.to_string()),
    };

    match users.insert(new_user).await? {
        Some(user) => {
            info!(user_id = %user.id, "Created user for verified phone");
            Ok(ResolvedIdentity { user, is_new: true })
        }
        None => {
            // Another login for the same phone won the insert.
            let existing = users
                .find_by_phone_number(&input.phone_number)
                .await?
                .context("user vanished after insert conflict")?;
            let user = refresh_login(existing, name, city, default_city, users).await?;
            Ok(ResolvedIdentity {
                user,
                is_new: false,
            })
        }
    }
}

async fn refresh_login(
    existing: User,
    name: Option<String>,
    city: Option<String>,
    default_city: &str,
    users: &dyn BaseUserRepository,
) -> Result<User> {
    let update = LoginUpdate {
        name: name.filter(|n| n != DEFAULT_USER_NAME && *n != existing.name),
        city: city.filter(|c| !c.eq_ignore_ascii_case(default_city) && *c != existing.city),
    };
    users.record_login(existing.id, update).await
}
