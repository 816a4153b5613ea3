use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, TimeDelta};
use std::collections::HashMap;
use std::sync::Arc;
use studio_core::interval::{end_time, format_hhmm};
use studio_core::{messages, NewBooking, ServiceDefinition};

use super::{parse_date, parse_time, store_error};
use crate::auth::AuthUser;
use crate::models::*;
use crate::AppState;

const MAX_NAME_LEN: usize = 100;
const MAX_PHONE_LEN: usize = 32;

fn service<'a>(state: &'a AppState, key: &str) -> Result<&'a ServiceDefinition, ApiError> {
    state
        .engine
        .catalog()
        .get(key)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("unknown service {key:?}")))
}

/// Refuses days before today and past the booking horizon.
fn check_window(state: &AppState, day: NaiveDate) -> Result<(), ApiError> {
    let today = state.clock.today();
    if day < today {
        return Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, "that date has already passed"));
    }
    let last = today + TimeDelta::days(i64::from(state.config.horizon_days) - 1);
    if day > last {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("bookings open {} days ahead", state.config.horizon_days),
        ));
    }
    Ok(())
}

// ── Endpoints ──

/// GET /api/services
/// Catalog in menu order.
pub async fn list_services(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<ServiceView>>> {
    let services = state.engine.catalog().iter().map(ServiceView::from).collect();
    Json(ApiResponse::success(services))
}

/// GET /api/available-dates?service=KEY
/// Bookable days with at least one free slot.
pub async fn available_dates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailableDatesQuery>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let duration = service(&state, &query.service)?.duration_min;
    let now = state.clock.now();

    let mut booked = HashMap::new();
    for day in state
        .engine
        .calendar()
        .bookable_days(now.date(), state.config.horizon_days)
    {
        let existing = state
            .store
            .fetch_confirmed_bookings(day)
            .await
            .map_err(|e| store_error("available_dates", e))?;
        booked.insert(day, existing);
    }

    let days = state
        .engine
        .days_with_free_slots(duration, state.config.horizon_days, now, |day| {
            booked.remove(&day).unwrap_or_default()
        })
        .into_iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();

    Ok(Json(ApiResponse::success(days)))
}

/// GET /api/available-times?date=YYYY-MM-DD&service=KEY
/// Free start times with derived ends.
pub async fn available_times(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailableTimesQuery>,
) -> Result<Json<ApiResponse<Vec<TimeBlock>>>, ApiError> {
    let duration = service(&state, &query.service)?.duration_min;
    let day = parse_date(&query.date)?;
    check_window(&state, day)?;

    let existing = state
        .store
        .fetch_confirmed_bookings(day)
        .await
        .map_err(|e| store_error("available_times", e))?;

    let times = state
        .engine
        .list_free_slots(day, duration, &existing, state.clock.now())
        .into_iter()
        .filter_map(|start| {
            end_time(start, duration).map(|end| TimeBlock {
                start_time: format_hhmm(start),
                end_time: format_hhmm(end),
            })
        })
        .collect();

    Ok(Json(ApiResponse::success(times)))
}

/// POST /api/bookings
/// Book for the authenticated user; the admin is notified.
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<CreateBookingRequest>,
) -> Result<Json<ApiResponse<BookingView>>, ApiError> {
    let name = body.name.trim();
    let phone = body.phone.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(api_error(StatusCode::BAD_REQUEST, "name is required"));
    }
    if phone.is_empty() || phone.chars().count() > MAX_PHONE_LEN {
        return Err(api_error(StatusCode::BAD_REQUEST, "phone is required"));
    }
    service(&state, &body.service)?;
    let day = parse_date(&body.date)?;
    let start_time = parse_time(&body.start_time)?;
    check_window(&state, day)?;

    let request = NewBooking {
        customer_id: user.id,
        customer_name: name.to_string(),
        customer_phone: phone.to_string(),
        service_key: body.service.clone(),
        day,
        start_time,
    };
    let now = state.clock.now();

    let id = state
        .store
        .insert_booking(&request, &state.engine, now)
        .await
        .map_err(|e| store_error("create_booking", e))?;

    let booking = request.into_booking(id, now);
    let catalog = state.engine.catalog();
    state.notifier.notify(
        state.config.admin_tg_id,
        messages::admin_new_booking(&booking, catalog),
    );

    Ok(Json(ApiResponse::success(BookingView::new(&booking, catalog))))
}

/// GET /api/bookings/my
/// The caller's upcoming bookings.
pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<Vec<BookingView>>>, ApiError> {
    let bookings = state
        .store
        .upcoming_for_customer(user.id, state.clock.today())
        .await
        .map_err(|e| store_error("my_bookings", e))?;

    let catalog = state.engine.catalog();
    let views = bookings.iter().map(|b| BookingView::new(b, catalog)).collect();
    Ok(Json(ApiResponse::success(views)))
}
