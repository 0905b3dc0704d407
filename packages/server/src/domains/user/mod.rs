//! User domain - identities created by phone login
//!
//! Responsibilities:
//! - Find-or-create users keyed by verified phone number
//! - Watchlist bookkeeping for authenticated users

pub mod activities;
pub mod models;

pub use models::User;
