use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, BookingView};
use crate::services::booking::{BookingPage, DayAvailability};
use crate::services::query::BookingCriteria;
use crate::services::validation::CreateBookingRequest;
use crate::state::AppState;

use super::check_auth;

// POST /bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let Json(req) = payload.map_err(|e| AppError::validation(e.body_text()))?;
    let booking = state.bookings.create(req).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<BookingCriteria>, QueryRejection>,
) -> Result<Json<BookingPage>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let Query(criteria) = query.map_err(|e| AppError::validation(e.body_text()))?;
    Ok(Json(state.bookings.list(&criteria).await?))
}

// GET /bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingView>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    Ok(Json(state.bookings.get(&id).await?))
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
}

// PATCH /bookings/:id/status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let Json(update) = payload.map_err(|e| AppError::validation(e.body_text()))?;

    let raw = update.status.unwrap_or_default();
    let status = BookingStatus::parse(raw.trim()).ok_or_else(|| {
        AppError::validation(format!(
            "status must be one of pending, confirmed, completed, cancelled: {raw}"
        ))
    })?;

    Ok(Json(state.bookings.change_status(&id, status).await?))
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: Option<String>,
}

// GET /availability?date=YYYY-MM-DD
pub async fn availability(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Json<DayAvailability>, AppError> {
    let Query(query) = query.map_err(|e| AppError::validation(e.body_text()))?;
    let date = query
        .date
        .ok_or_else(|| AppError::validation("date is required"))?;
    Ok(Json(state.bookings.available_slots(&date).await?))
}
