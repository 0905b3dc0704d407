//! Lead domain activities

mod record_lead;

pub use record_lead::{record_verification_lead, LEAD_SOURCE_OTP};
