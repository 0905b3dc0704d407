//! User domain activities

mod upsert_identity;
mod watchlist;

pub use upsert_identity::{upsert_identity, IdentityInput, ResolvedIdentity, DEFAULT_USER_NAME};
pub use watchlist::{update_watchlist, WatchlistChange};
