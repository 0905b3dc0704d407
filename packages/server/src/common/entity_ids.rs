//! Typed ids for persisted entities.

pub use super::id::Id;

/// Marker for user identities.
pub struct User;

/// Marker for sales leads.
pub struct Lead;

pub type UserId = Id<User>;
pub type LeadId = Id<Lead>;
