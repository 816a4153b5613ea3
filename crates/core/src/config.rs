//! Studio settings read from the environment (`.env` is loaded by the binaries).

use std::sync::Arc;

use crate::availability::AvailabilityEngine;
use crate::calendar::{parse_closed_days, BusinessCalendar};
use crate::catalog::Catalog;
use crate::error::ConfigError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:bookings.db?mode=rwc";
pub const DEFAULT_HORIZON_DAYS: u32 = 7;

#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub bot_token: String,
    pub admin_tg_id: i64,
    pub database_url: String,
    pub business_name: String,
    pub business_address: String,
    pub calendar: BusinessCalendar,
    pub catalog: Arc<Catalog>,
    /// How many days ahead (today included) customers may book.
    pub horizon_days: u32,
}

impl StudioConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = lookup("BOT_TOKEN")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("BOT_TOKEN"))?;
        let admin_tg_id = parse_var(&lookup, "ADMIN_TG_ID")?.ok_or(ConfigError::Missing("ADMIN_TG_ID"))?;

        let open_hour = parse_var(&lookup, "OPEN_HOUR")?.unwrap_or(9);
        let close_hour = parse_var(&lookup, "CLOSE_HOUR")?.unwrap_or(18);
        let closed_days = parse_closed_days(&lookup("CLOSED_DAYS").unwrap_or_else(|| "6".into()))?;
        let calendar = BusinessCalendar::new(open_hour, close_hour, closed_days)?;

        let catalog = match lookup("CATALOG_PATH").filter(|p| !p.trim().is_empty()) {
            Some(path) => {
                let catalog = Catalog::from_json_file(&path)?;
                tracing::info!(path = %path, services = catalog.len(), "Loaded service catalog");
                catalog
            }
            None => Catalog::default(),
        };

        let horizon_days = parse_var(&lookup, "BOOKING_HORIZON_DAYS")?.unwrap_or(DEFAULT_HORIZON_DAYS);
        if horizon_days == 0 {
            return Err(ConfigError::Invalid {
                var: "BOOKING_HORIZON_DAYS",
                value: "0".into(),
            });
        }

        Ok(Self {
            bot_token,
            admin_tg_id,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            business_name: lookup("BUSINESS_NAME").unwrap_or_else(|| "Anthony Studio".into()),
            business_address: lookup("BUSINESS_ADDRESS").unwrap_or_else(|| "123 Main St".into()),
            calendar,
            catalog: Arc::new(catalog),
            horizon_days,
        })
    }

    pub fn engine(&self) -> AvailabilityEngine {
        AvailabilityEngine::new(self.calendar.clone(), Arc::clone(&self.catalog))
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

// ── Tests ──
