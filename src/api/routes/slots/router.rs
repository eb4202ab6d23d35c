//! Router for the slots API

use std::sync::{Arc, RwLock};

use axum::{Router, extract::State, response::Json, routing::get};
use axum_extra::extract::Query;
use chrono::{Datelike, NaiveDate, Utc};

use super::public;
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::scheduling::{
    AvailableDaysCache, compute_slots_for_date, fetch_event_type_context,
};

type SharedState = Arc<RwLock<AppState>>;

async fn slots_handler(
    State(state): State<SharedState>,
    Query(params): Query<public::SlotsQuery>,
) -> Result<Json<public::SlotsResponse>, ApiError> {
    let date = NaiveDate::parse_from_str(&params.date, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request("Invalid date, expected YYYY-MM-DD"))?;

    let (db, calendar) = {
        let shared_state = state.read().unwrap();
        (shared_state.db.clone(), shared_state.calendar.clone())
    };

    let ctx = fetch_event_type_context(&db, &params.event_type_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event type not found"))?;

    let slots = compute_slots_for_date(&db, calendar.as_ref(), &ctx, date, false, Utc::now()).await?;
    tracing::debug!(
        "Computed {} slots for event type {} on {}",
        slots.len(),
        params.event_type_id,
        params.date
    );

    Ok(Json(public::SlotsResponse { slots }))
}

async fn available_days_handler(
    State(state): State<SharedState>,
    Query(params): Query<public::AvailableDaysQuery>,
) -> Result<Json<public::AvailableDaysResponse>, ApiError> {
    let month_start = NaiveDate::parse_from_str(&format!("{}-01", params.month), "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request("Invalid month, expected YYYY-MM"))?;

    let (db, calendar, cache) = {
        let shared_state = state.read().unwrap();
        (
            shared_state.db.clone(),
            shared_state.calendar.clone(),
            shared_state.days_cache.clone(),
        )
    };

    let now = Utc::now();
    let cache_key = AvailableDaysCache::key(&params.event_type_id, &params.month);
    if let Some(days) = cache.get(&cache_key, now) {
        return Ok(Json(public::AvailableDaysResponse { days }));
    }

    let ctx = fetch_event_type_context(&db, &params.event_type_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event type not found"))?;

    let mut days = Vec::new();
    let mut date = month_start;
    while date.month() == month_start.month() {
        let slots = match compute_slots_for_date(&db, calendar.as_ref(), &ctx, date, false, now)
            .await
        {
            Ok(slots) => slots,
            Err(err) => {
                // Retry without the external calendar before giving
                // up on the day entirely
                tracing::warn!("Slot computation failed for {}: {}", date, err);
                compute_slots_for_date(&db, calendar.as_ref(), &ctx, date, true, now)
                    .await
                    .unwrap_or_default()
            }
        };
        if !slots.is_empty() {
            days.push(date.format("%Y-%m-%d").to_string());
        }
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    cache.insert(cache_key, days.clone(), now);

    Ok(Json(public::AvailableDaysResponse { days }))
}

/// Create the slots router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/slots", get(slots_handler))
        .route("/available-days", get(available_days_handler))
}
