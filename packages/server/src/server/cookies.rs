//! Session cookies set after login and cleared on logout.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::common::UserId;
use crate::domains::auth::jwt::{ACCESS_TOKEN_TTL_MINUTES, REFRESH_TOKEN_TTL_DAYS};
use crate::domains::auth::TokenPair;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
/// Mirror of `accessToken` kept for older clients.
pub const LEGACY_TOKEN_COOKIE: &str = "token";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";
pub const USER_ID_COOKIE: &str = "userId";

const SESSION_COOKIES: [&str; 4] = [
    ACCESS_TOKEN_COOKIE,
    LEGACY_TOKEN_COOKIE,
    REFRESH_TOKEN_COOKIE,
    USER_ID_COOKIE,
];

/// Attributes shared by every cookie we set.
#[derive(Debug, Clone, Copy, Default)]
pub struct CookiePolicy {
    pub secure: bool,
}

impl CookiePolicy {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// Add the cookies for a freshly issued token pair.
    pub fn with_session(&self, jar: CookieJar, tokens: &TokenPair, user_id: UserId) -> CookieJar {
        let access_max_age = Duration::minutes(ACCESS_TOKEN_TTL_MINUTES);
        let refresh_max_age = Duration::days(REFRESH_TOKEN_TTL_DAYS);

        jar.add(self.cookie(ACCESS_TOKEN_COOKIE, tokens.access_token.clone(), access_max_age))
            .add(self.cookie(LEGACY_TOKEN_COOKIE, tokens.access_token.clone(), access_max_age))
            .add(self.cookie(REFRESH_TOKEN_COOKIE, tokens.refresh_token.clone(), refresh_max_age))
            .add(self.cookie(USER_ID_COOKIE, user_id.to_string(), refresh_max_age))
    }

    /// Expire every session cookie.
    pub fn cleared(&self, jar: CookieJar) -> CookieJar {
        SESSION_COOKIES.into_iter().fold(jar, |jar, name| {
            jar.add(self.cookie(name, String::new(), Duration::ZERO))
        })
    }

    fn cookie(&self, name: &'static str, value: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(self.secure)
            .max_age(max_age)
            .build()
    }
}

/// A non-empty cookie value from the request.
pub fn cookie_value(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, HeaderMap, HeaderValue};

    fn tokens() -> TokenPair {
        TokenPair {
            access_token: "access.jwt.value".to_string(),
            refresh_token: "refresh.jwt.value".to_string(),
        }
    }

    #[test]
    fn test_session_cookies_have_expected_lifetimes() {
        let user_id = UserId::new();
        let jar = CookiePolicy::new(false).with_session(CookieJar::new(), &tokens(), user_id);

        let access = jar.get(ACCESS_TOKEN_COOKIE).unwrap();
        assert_eq!(access.value(), "access.jwt.value");
        assert_eq!(access.max_age(), Some(Duration::seconds(900)));
        assert_eq!(jar.get(LEGACY_TOKEN_COOKIE).unwrap().value(), "access.jwt.value");

        let refresh = jar.get(REFRESH_TOKEN_COOKIE).unwrap();
        assert_eq!(refresh.value(), "refresh.jwt.value");
        assert_eq!(refresh.max_age(), Some(Duration::seconds(2_592_000)));

        let user = jar.get(USER_ID_COOKIE).unwrap();
        assert_eq!(user.value(), user_id.to_string());

        for name in SESSION_COOKIES {
            let cookie = jar.get(name).unwrap();
            assert_eq!(cookie.http_only(), Some(true));
            assert_eq!(cookie.same_site(), Some(SameSite::Strict));
            assert_eq!(cookie.path(), Some("/"));
            assert_ne!(cookie.secure(), Some(true));
        }
    }

    #[test]
    fn test_secure_flag_in_production() {
        let jar = CookiePolicy::new(true).cleared(CookieJar::new());
        for name in SESSION_COOKIES {
            let cookie = jar.get(name).unwrap();
            assert_eq!(cookie.max_age(), Some(Duration::ZERO));
            assert_eq!(cookie.value(), "");
            assert_eq!(cookie.secure(), Some(true));
        }
    }

    #[test]
    fn test_cookie_value_reads_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; refreshToken=abc.def; userId=42; token="),
        );
        let jar = CookieJar::from_headers(&headers);

        assert_eq!(cookie_value(&jar, REFRESH_TOKEN_COOKIE).as_deref(), Some("abc.def"));
        assert_eq!(cookie_value(&jar, ACCESS_TOKEN_COOKIE), None);
        assert_eq!(cookie_value(&jar, LEGACY_TOKEN_COOKIE), None);
    }
}
