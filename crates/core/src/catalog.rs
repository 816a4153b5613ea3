//! Fixed service catalog, loaded once at startup.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::interval::MINUTES_PER_DAY;

/// Footprint of a booking whose service key is no longer in the catalog.
pub const FALLBACK_DURATION_MIN: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub key: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "duration")]
    pub duration_min: u32,
    pub price: Decimal,
}

/// Ordered, immutable set of services. Order is menu order.
#[derive(Debug, Clone)]
pub struct Catalog {
    services: Vec<ServiceDefinition>,
}

impl Catalog {
    pub fn new(services: Vec<ServiceDefinition>) -> Result<Self, ConfigError> {
        if services.is_empty() {
            return Err(ConfigError::Catalog("catalog has no services".into()));
        }
        for (i, s) in services.iter().enumerate() {
            if s.key.trim().is_empty() {
                return Err(ConfigError::Catalog(format!("service #{} has an empty key", i + 1)));
            }
            if s.duration_min == 0 {
                return Err(ConfigError::Catalog(format!("{}: duration must be > 0", s.key)));
            }
            if s.duration_min > MINUTES_PER_DAY {
                return Err(ConfigError::Catalog(format!("{}: duration longer than a day", s.key)));
            }
            if s.price.is_sign_negative() {
                return Err(ConfigError::Catalog(format!("{}: price must be >= 0", s.key)));
            }
            if services[..i].iter().any(|other| other.key == s.key) {
                return Err(ConfigError::Catalog(format!("duplicate key {}", s.key)));
            }
        }
        Ok(Self { services })
    }

    /// Read a JSON array of `{key, name, duration, price}` objects.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let services: Vec<ServiceDefinition> = serde_json::from_str(raw)?;
        Self::new(services)
    }

    pub fn get(&self, key: &str) -> Option<&ServiceDefinition> {
        self.services.iter().find(|s| s.key == key)
    }

    /// Duration used for overlap checks. Unknown keys get [`FALLBACK_DURATION_MIN`].
    pub fn service_duration(&self, key: &str) -> u32 {
        match self.get(key) {
            Some(s) => s.duration_min,
            None => {
                tracing::warn!(service = key, "unknown service key, using fallback duration");
                FALLBACK_DURATION_MIN
            }
        }
    }

    /// Display name, or the raw key for services that left the catalog.
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).map_or(key, |s| s.display_name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceDefinition> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl Default for Catalog {
    /// The studio's standard menu.
    fn default() -> Self {
        let entry = |key: &str, name: &str, duration_min: u32, price: i64| ServiceDefinition {
            key: key.into(),
            display_name: name.into(),
            duration_min,
            price: Decimal::from(price),
        };
        Self {
            services: vec![
                entry("haircut", "Haircut", 30, 25),
                entry("beard", "Beard Trim", 20, 15),
                entry("color", "Hair Color", 90, 80),
                entry("style", "Wash & Style", 45, 40),
            ],
        }
    }
}

// ── Tests ──
