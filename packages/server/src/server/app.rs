//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use axum::{
    error_handling::HandleErrorLayer,
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    middleware,
    routing::{get, post},
    BoxError, Router,
};
use sqlx::PgPool;
use tower::{timeout::error::Elapsed, timeout::TimeoutLayer, ServiceBuilder};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use twofactor::{TwoFactorOptions, TwoFactorService};

use crate::config::Config;
use crate::domains::auth::models::InMemoryOtpSessionStore;
use crate::domains::auth::JwtService;
use crate::kernel::{PostgresLeadRepository, PostgresUserRepository, ServerDeps, TwoFactorAdapter};
use crate::server::cookies::CookiePolicy;
use crate::server::error::ApiError;
use crate::server::middleware::jwt_auth_middleware;
use crate::server::routes::{
    add_watchlist_handler, health_handler, logout_handler, me_handler, refresh_handler,
    remove_watchlist_handler, send_otp_handler, verify_otp_handler,
};

/// Upper bound for one request; covers an SMS attempt plus the voice fallback.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: Arc<ServerDeps>,
    /// `None` only in router tests that run without a database.
    pub db_pool: Option<PgPool>,
    pub cookies: CookiePolicy,
}

impl AppState {
    pub fn new(deps: ServerDeps, db_pool: Option<PgPool>, cookies: CookiePolicy) -> Self {
        Self {
            deps: Arc::new(deps),
            db_pool,
            cookies,
        }
    }
}

fn auth_routes() -> Router {
    Router::new()
        .route("/send-otp", post(send_otp_handler))
        .route("/verify-otp", post(verify_otp_handler))
        .route("/refresh", post(refresh_handler))
        .route("/logout", post(logout_handler))
        .route("/me", get(me_handler))
        .route(
            "/me/watchlist/:property_id",
            post(add_watchlist_handler).delete(remove_watchlist_handler),
        )
}

/// Shared route table and per-request middleware.
fn assemble(state: AppState, auth: Router) -> Router {
    let jwt_service = state.deps.jwt_service.clone();

    Router::new()
        .nest("/api/auth", auth)
        // Health check (no rate limit)
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(move |req, next| {
            jwt_auth_middleware(jwt_service.clone(), req, next)
        }))
        .layer(Extension(state))
}

/// Routes without rate limiting, tracing or CORS.
///
/// The rate limiter keys on the peer address, which in-process test
/// requests don't carry.
pub fn api_router(state: AppState) -> Router {
    assemble(state, auth_routes())
}

/// Wire production dependencies from config.
pub fn build_deps(config: &Config, pool: PgPool) -> ServerDeps {
    let mut twofactor_options = TwoFactorOptions::new(config.twofactor_api_key.clone());
    twofactor_options.base_url = config.twofactor_base_url.clone();
    twofactor_options.template = config.twofactor_otp_template.clone();
    let twofactor = Arc::new(TwoFactorService::new(twofactor_options));

    let jwt_service = Arc::new(JwtService::new(
        &config.jwt_secret,
        config.jwt_issuer.clone(),
    ));

    ServerDeps::new(
        Arc::new(TwoFactorAdapter::new(twofactor)),
        Arc::new(InMemoryOtpSessionStore::new()),
        Arc::new(PostgresUserRepository::new(pool.clone())),
        Arc::new(PostgresLeadRepository::new(pool)),
        jwt_service,
        config.default_city.clone(),
    )
}

/// Build the Axum application router
///
/// Returns the router and the shared deps (needed by scheduled tasks).
pub fn build_app(config: &Config, pool: PgPool) -> Result<(Router, Arc<ServerDeps>)> {
    let state = AppState::new(
        build_deps(config, pool.clone()),
        Some(pool),
        CookiePolicy::new(config.is_production()),
    );
    let deps = state.deps.clone();

    // Rate limiting configuration
    // OTP sends cost money per message, so the auth routes get a tight per-IP budget.
    // Client IP comes from X-Forwarded-For / X-Real-IP when behind a proxy.
    let rate_limit_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(SmartIpKeyExtractor)
            .per_millisecond(replenish_interval_ms(config.rate_limit_per_second)?)
            .burst_size(config.rate_limit_burst)
            .use_headers()
            .finish()
            .context("Rate limit settings must be non-zero")?,
    );

    let rate_limit_layer = GovernorLayer {
        config: rate_limit_config,
    };

    let app = assemble(state, auth_routes().layer(rate_limit_layer))
        .layer(cors_layer(&config.allowed_origins));
    let app = with_request_timeout(app, REQUEST_TIMEOUT).layer(TraceLayer::new_for_http());

    Ok((app, deps))
}

/// Milliseconds between quota refills for a rate of `per_second` requests.
///
/// The governor config takes the refill interval, not a rate.
fn replenish_interval_ms(per_second: u64) -> Result<u64> {
    if per_second == 0 || per_second > 1000 {
        bail!("RATE_LIMIT_PER_SECOND must be between 1 and 1000");
    }
    Ok(1000 / per_second)
}

/// Abort requests that run longer than `timeout` with a JSON 408.
fn with_request_timeout(router: Router, timeout: Duration) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_timeout_error))
            .layer(TimeoutLayer::new(timeout)),
    )
}

async fn handle_timeout_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        tracing::warn!("Request timed out");
        ApiError::new(StatusCode::REQUEST_TIMEOUT, "Request timed out")
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
        ApiError::internal()
    }
}

/// CORS configuration - any origin when none are configured (development).
///
/// Credentialed requests (cookies) need an explicit origin list.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
    }
}
