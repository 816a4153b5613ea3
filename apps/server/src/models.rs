use axum::{http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use studio_core::interval::format_hhmm;
use studio_core::{Booking, Catalog, ServiceDefinition};

// ── Envelope ──

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Error half of every handler's return type.
pub type ApiError = (StatusCode, Json<ApiResponse<()>>);

pub fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(ApiResponse::error(msg)))
}

// ── Requests ──

#[derive(Debug, Deserialize)]
pub struct AvailableDatesQuery {
    pub service: String,
}

#[derive(Debug, Deserialize)]
pub struct AvailableTimesQuery {
    pub date: String,
    pub service: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub service: String,
    pub date: String,
    pub start_time: String,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminBookingsQuery {
    pub date: Option<String>,
}

// ── Responses ──

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceView {
    pub key: String,
    pub name: String,
    pub duration_min: u32,
    pub price: Decimal,
}

impl From<&ServiceDefinition> for ServiceView {
    fn from(s: &ServiceDefinition) -> Self {
        Self {
            key: s.key.clone(),
            name: s.display_name.clone(),
            duration_min: s.duration_min,
            price: s.price,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeBlock {
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingView {
    pub id: i64,
    pub service: String,
    pub service_name: String,
    pub date: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub name: String,
    pub phone: String,
    pub status: String,
    pub price: Option<Decimal>,
}

impl BookingView {
    pub fn new(b: &Booking, catalog: &Catalog) -> Self {
        Self {
            id: b.id,
            service: b.service_key.clone(),
            service_name: catalog.display_name(&b.service_key).to_string(),
            date: b.day.format("%Y-%m-%d").to_string(),
            start_time: format_hhmm(b.start_time),
            end_time: b.end_time(catalog).map(format_hhmm),
            name: b.customer_name.clone(),
            phone: b.customer_phone.clone(),
            status: b.status.as_str().to_string(),
            price: catalog.get(&b.service_key).map(|s| s.price),
        }
    }
}

// ── Telegram auth ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}
