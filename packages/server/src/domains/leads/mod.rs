//! Leads domain - sales prospects captured from verified logins

pub mod activities;
pub mod models;

pub use models::Lead;
