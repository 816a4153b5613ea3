use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::rate_limit::{rate_limit, RateLimiter, Tier};
use crate::AppState;

/// The full API, one route group per rate-limit tier.
pub fn router(state: Arc<AppState>, limiter: RateLimiter) -> Router {
    // Health checks are never limited
    let no_limit_routes = Router::new().route("/api/health", get(handlers::health::health));

    let public_routes = Router::new()
        .route("/api/services", get(handlers::client::list_services))
        .route("/api/available-dates", get(handlers::client::available_dates))
        .route("/api/available-times", get(handlers::client::available_times))
        .layer(from_fn_with_state((limiter.clone(), Tier::Public), rate_limit));

    let booking_routes = Router::new()
        .route("/api/bookings", post(handlers::client::create_booking))
        .layer(from_fn_with_state((limiter.clone(), Tier::Booking), rate_limit));

    let auth_routes = Router::new()
        .route("/api/bookings/my", get(handlers::client::my_bookings))
        .layer(from_fn_with_state((limiter.clone(), Tier::Auth), rate_limit));

    let admin_routes = Router::new()
        .route("/api/admin/bookings", get(handlers::admin::list_bookings))
        .layer(from_fn_with_state((limiter, Tier::Admin), rate_limit));

    Router::new()
        .merge(no_limit_routes)
        .merge(public_routes)
        .merge(booking_routes)
        .merge(auth_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Whitelist the Mini App origin (plus the Vite dev server) when known.
pub fn cors(webapp_url: Option<&str>) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let Some(webapp_url) = webapp_url else {
        return Ok(layer.allow_origin(Any));
    };

    let origin = url::Url::parse(webapp_url)?.origin().ascii_serialization();
    let origins = [origin.as_str(), "http://localhost:5173"]
        .into_iter()
        .map(HeaderValue::from_str)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

// ── Tests ──
