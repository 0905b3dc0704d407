//! Auth domain - phone login via one-time codes
//!
//! Responsibilities:
//! - Sending codes through the OTP gateway (SMS, voice fallback)
//! - Pending-session bookkeeping with expiry and attempt limits
//! - Access/refresh JWT issuance

pub mod activities;
pub mod errors;
pub mod jwt;
pub mod models;
pub mod types;

pub use errors::AuthFlowError;
pub use jwt::{Claims, JwtService, TokenPair, TokenType};
