//! Auth domain activities - business logic functions
//!
//! Activities are plain async functions taking `&ServerDeps`; HTTP handlers call them directly.

mod refresh_tokens;
mod send_otp;
mod verify_otp;

pub use refresh_tokens::refresh_tokens;
pub use send_otp::send_otp;
pub use verify_otp::verify_otp;
