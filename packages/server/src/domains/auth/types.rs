//! Auth domain data types
//!
//! Inputs accepted and results returned by auth activities.

use twofactor::DeliveryChannel;

use crate::common::PropertyContext;
use crate::domains::leads::models::Lead;
use crate::domains::user::models::User;

/// Request to start a phone login.
#[derive(Debug, Clone, Default)]
pub struct SendOtpInput {
    /// Ten local digits.
    pub phone: String,
    pub name: Option<String>,
    pub city: Option<String>,
    pub property: PropertyContext,
}

/// Result of sending an OTP
#[derive(Debug, Clone)]
pub struct OtpSent {
    pub session_id: String,
    pub channel: DeliveryChannel,
}

/// Request to finish a phone login.
#[derive(Debug, Clone, Default)]
pub struct VerifyOtpInput {
    pub session_id: String,
    pub otp: String,
    /// Values supplied at verify time win over those captured at send time.
    pub name: Option<String>,
    pub city: Option<String>,
    pub property: PropertyContext,
    pub source: Option<String>,
}

/// Result of verifying an OTP
#[derive(Debug, Clone)]
pub struct OtpVerified {
    pub user: User,
    pub is_new: bool,
    /// `None` when the lead could not be written.
    pub lead: Option<Lead>,
    pub access_token: String,
    pub refresh_token: String,
}
