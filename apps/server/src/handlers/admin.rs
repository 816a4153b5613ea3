use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use super::{parse_date, store_error};
use crate::auth::AdminUser;
use crate::models::*;
use crate::AppState;

/// GET /api/admin/bookings?date=YYYY-MM-DD
/// One day, or everything upcoming.
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<AdminBookingsQuery>,
) -> Result<Json<ApiResponse<Vec<BookingView>>>, ApiError> {
    let bookings = match query.date.as_deref() {
        Some(raw) => {
            let day = parse_date(raw)?;
            state.store.bookings_on(day).await
        }
        None => state.store.upcoming(state.clock.today()).await,
    }
    .map_err(|e| store_error("admin list_bookings", e))?;

    let catalog = state.engine.catalog();
    let views = bookings.iter().map(|b| BookingView::new(b, catalog)).collect();
    Ok(Json(ApiResponse::success(views)))
}
