// Estate Listings - API Core
//
// Phone login for the listings site: OTP send/verify through the 2Factor
// gateway, user upsert, lead capture and JWT issuance.
//
// Activities are organized per-domain in domains/*/activities/

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
