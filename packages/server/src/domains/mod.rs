// Business domains
pub mod auth;
pub mod leads;
pub mod user;
