pub mod admin;
pub mod client;
pub mod health;

use axum::http::StatusCode;
use chrono::{NaiveDate, NaiveTime};
use studio_core::interval::parse_hhmm;
use studio_core::StoreError;

use crate::models::{api_error, ApiError};

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "date must be YYYY-MM-DD"))
}

pub(crate) fn parse_time(raw: &str) -> Result<NaiveTime, ApiError> {
    parse_hhmm(raw).ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "start_time must be HH:MM"))
}

/// Map store failures onto HTTP: 409 taken, 422 not bookable, 500 otherwise.
pub(crate) fn store_error(context: &str, e: StoreError) -> ApiError {
    match e {
        StoreError::SlotTaken => api_error(StatusCode::CONFLICT, "that time was just taken"),
        StoreError::Rejected(reason) => api_error(StatusCode::UNPROCESSABLE_ENTITY, reason.to_string()),
        other => {
            tracing::error!("{}: {}", context, other);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}
