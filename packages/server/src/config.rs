use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// `production` turns on `Secure` cookies.
    pub app_env: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    /// Missing keys are reported when the gateway is first called, not here.
    pub twofactor_api_key: Option<String>,
    pub twofactor_base_url: String,
    pub twofactor_otp_template: String,
    /// City assigned to new users who don't supply one.
    pub default_city: String,
    pub allowed_origins: Vec<String>,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "estate-api".to_string()),
            twofactor_api_key: env::var("TWOFACTOR_API_KEY").ok(),
            twofactor_base_url: env::var("TWOFACTOR_BASE_URL")
                .unwrap_or_else(|_| twofactor::DEFAULT_BASE_URL.to_string()),
            twofactor_otp_template: env::var("TWOFACTOR_OTP_TEMPLATE")
                .unwrap_or_else(|_| twofactor::DEFAULT_TEMPLATE.to_string()),
            default_city: env::var("DEFAULT_CITY").unwrap_or_else(|_| "Delhi".to_string()),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|origins| parse_origins(&origins))
                .unwrap_or_default(),
            rate_limit_per_second: env::var("RATE_LIMIT_PER_SECOND")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .context("RATE_LIMIT_PER_SECOND must be a valid number")?,
            rate_limit_burst: env::var("RATE_LIMIT_BURST")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("RATE_LIMIT_BURST must be a valid number")?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins_skips_blanks() {
        assert_eq!(
            parse_origins("https://a.example, ,https://b.example,"),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }
}
