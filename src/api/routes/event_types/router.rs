//! Router for the event types API

use std::sync::{Arc, RwLock};

use axum::{
    Router,
    extract::State,
    response::Json,
    routing::get,
};
use axum_extra::extract::Query;
use serde_json::{Value, json};
use uuid::Uuid;

use super::db as event_types_db;
use super::public;
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::scheduling::{EventType, SchedulingMode};

type SharedState = Arc<RwLock<AppState>>;

const VALID_MODES: [&str; 3] = ["solo", "round_robin", "collective"];

/// Events and buffers fit within a day; slots are computed per
/// calendar day so anything longer can never be booked anyway.
const MAX_DURATION_MINUTES: i64 = 24 * 60;
/// Minimum notice is capped at a year.
const MAX_NOTICE_MINUTES: i64 = 365 * 24 * 60;

fn validate_mode(mode: &Option<String>) -> Result<Option<SchedulingMode>, ApiError> {
    match mode {
        None => Ok(None),
        Some(mode) if VALID_MODES.contains(&mode.as_str()) => {
            Ok(Some(SchedulingMode::parse(mode)))
        }
        Some(_) => Err(ApiError::bad_request(
            "Invalid scheduling_mode, expected solo, round_robin, or collective",
        )),
    }
}

fn validate_durations(
    duration_minutes: i64,
    buffer_before: i64,
    buffer_after: i64,
    min_notice_minutes: i64,
) -> Result<(), ApiError> {
    if duration_minutes <= 0 || duration_minutes > MAX_DURATION_MINUTES {
        return Err(ApiError::bad_request(
            "duration_minutes must be between 1 and 1440",
        ));
    }
    if buffer_before < 0 || buffer_after < 0 {
        return Err(ApiError::bad_request("Buffers must not be negative"));
    }
    if buffer_before > MAX_DURATION_MINUTES || buffer_after > MAX_DURATION_MINUTES {
        return Err(ApiError::bad_request("Buffers must not exceed 1440 minutes"));
    }
    if min_notice_minutes < 0 || min_notice_minutes > MAX_NOTICE_MINUTES {
        return Err(ApiError::bad_request(
            "min_notice_minutes must be between 0 and 525600",
        ));
    }
    Ok(())
}

// Get one or list all event types
async fn get_event_types(
    State(state): State<SharedState>,
    Query(params): Query<public::EventTypeQuery>,
) -> Result<Json<Value>, ApiError> {
    let db = state.read().unwrap().db.clone();

    if let Some(id) = params.id {
        let event_type = event_types_db::get_event_type(&db, &id)
            .await?
            .ok_or_else(|| ApiError::not_found("Event type not found"))?;
        return Ok(Json(json!(public::EventTypeResponse { event_type })));
    }

    let event_types = event_types_db::list_event_types(&db).await?;
    Ok(Json(json!(public::EventTypeListResponse { event_types })))
}

// Create event type endpoint
async fn create_event_type(
    State(state): State<SharedState>,
    Json(req): Json<public::CreateEventTypeRequest>,
) -> Result<Json<public::EventTypeResponse>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("Missing name"));
    }
    let buffer_before = req.buffer_before.unwrap_or(0);
    let buffer_after = req.buffer_after.unwrap_or(0);
    let min_notice_minutes = req.min_notice_minutes.unwrap_or(60);
    validate_durations(req.duration_minutes, buffer_before, buffer_after, min_notice_minutes)?;
    let scheduling_mode = validate_mode(&req.scheduling_mode)?.unwrap_or(SchedulingMode::Solo);

    let event_type = EventType {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        owner_host_id: req.owner_host_id,
        duration_minutes: req.duration_minutes,
        buffer_before,
        buffer_after,
        min_notice_minutes,
        scheduling_mode,
        team_id: req.team_id,
    };

    let db = state.read().unwrap().db.clone();
    event_types_db::insert_event_type(
        &db,
        event_type.clone(),
        req.host_ids.unwrap_or_default(),
    )
    .await?;

    Ok(Json(public::EventTypeResponse { event_type }))
}

// Update event type endpoint
async fn update_event_type(
    State(state): State<SharedState>,
    Json(req): Json<public::UpdateEventTypeRequest>,
) -> Result<Json<public::EventTypeResponse>, ApiError> {
    let db = state.read().unwrap().db.clone();

    let existing = event_types_db::get_event_type(&db, &req.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event type not found"))?;

    let updated = EventType {
        name: req.name.unwrap_or(existing.name),
        duration_minutes: req.duration_minutes.unwrap_or(existing.duration_minutes),
        buffer_before: req.buffer_before.unwrap_or(existing.buffer_before),
        buffer_after: req.buffer_after.unwrap_or(existing.buffer_after),
        min_notice_minutes: req.min_notice_minutes.unwrap_or(existing.min_notice_minutes),
        scheduling_mode: validate_mode(&req.scheduling_mode)?.unwrap_or(existing.scheduling_mode),
        ..existing
    };
    validate_durations(
        updated.duration_minutes,
        updated.buffer_before,
        updated.buffer_after,
        updated.min_notice_minutes,
    )?;

    event_types_db::update_event_type(&db, updated.clone(), req.host_ids).await?;

    Ok(Json(public::EventTypeResponse { event_type: updated }))
}

// Delete event type endpoint
async fn delete_event_type(
    State(state): State<SharedState>,
    Json(req): Json<public::DeleteEventTypeRequest>,
) -> Result<Json<Value>, ApiError> {
    let db = state.read().unwrap().db.clone();
    event_types_db::delete_event_type(&db, &req.id).await?;
    Ok(Json(json!({ "success": true })))
}

/// Create the event types router
pub fn router() -> Router<SharedState> {
    Router::new().route(
        "/",
        get(get_event_types)
            .post(create_event_type)
            .put(update_event_type)
            .delete(delete_event_type),
    )
}
