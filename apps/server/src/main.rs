mod auth;
mod handlers;
mod models;
mod notify;
mod rate_limit;
mod routes;
mod telegram_layer;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use studio_core::{AvailabilityEngine, BookingStore, Clock, StudioConfig, SystemClock};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use notify::{Notifier, TelegramNotifier};
use rate_limit::RateLimiter;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub store: BookingStore,
    pub engine: AvailabilityEngine,
    pub config: StudioConfig,
    pub clock: Arc<dyn Clock>,
    pub notifier: Arc<dyn Notifier>,
    pub started_at: Instant,
}

/// Rate limit cleanup interval (seconds).
const RATE_LIMIT_CLEANUP_SECS: u64 = 300;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Config first so the Telegram layer knows where to send errors
    let config = StudioConfig::from_env()?;

    // ── Tracing: console + Telegram error notifications ──
    let env_filter = EnvFilter::from_default_env().add_directive("info".parse()?);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(telegram_layer::TelegramLayer::new(
            config.bot_token.clone(),
            config.admin_tg_id,
            config.business_name.clone(),
        ))
        .init();

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    let webapp_url = std::env::var("WEBAPP_URL").ok().filter(|u| !u.trim().is_empty());
    if webapp_url.is_none() {
        tracing::warn!("WEBAPP_URL not set, CORS allows any origin");
    }

    // ── Database ──
    let store = BookingStore::connect(&config.database_url, 5).await?;

    let state = Arc::new(AppState {
        store,
        engine: config.engine(),
        notifier: Arc::new(TelegramNotifier::new(config.bot_token.clone())),
        config,
        clock: Arc::new(SystemClock),
        started_at: Instant::now(),
    });

    // ── Rate limiter + cleanup task ──
    let rate_limiter = RateLimiter::default();
    let cleanup_limiter = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(RATE_LIMIT_CLEANUP_SECS));
        loop {
            interval.tick().await;
            cleanup_limiter.cleanup();
        }
    });

    let app = routes::router(state.clone(), rate_limiter)
        .layer(routes::cors(webapp_url.as_deref())?);

    let addr = format!("{}:{}", host, port);
    tracing::info!("{} server starting on {}", state.config.business_name, addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
