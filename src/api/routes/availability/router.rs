//! Router for the availability API

use std::sync::{Arc, RwLock};

use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::{delete, get, post},
};
use axum_extra::extract::Query;
use chrono::{DateTime, NaiveTime};
use serde_json::{Value, json};
use uuid::Uuid;

use super::db as availability_db;
use super::public;
use crate::api::public::ApiError;
use crate::api::state::AppState;

type SharedState = Arc<RwLock<AppState>>;

fn parse_window_time(value: &str) -> Result<NaiveTime, ApiError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| ApiError::bad_request("Invalid window time, expected HH:MM"))
}

// Host availability listing endpoint
async fn get_availability(
    State(state): State<SharedState>,
    Query(params): Query<public::AvailabilityQuery>,
) -> Result<Json<public::AvailabilityResponse>, ApiError> {
    let db = state.read().unwrap().db.clone();
    let windows = availability_db::list_windows(&db, &params.host_id).await?;
    let blocks = availability_db::list_blocks(&db, &params.host_id).await?;
    Ok(Json(public::AvailabilityResponse { windows, blocks }))
}

// Create recurring weekly window endpoint
async fn create_window(
    State(state): State<SharedState>,
    Json(req): Json<public::CreateWindowRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.day_of_week > 6 {
        return Err(ApiError::bad_request("day_of_week must be 0 through 6"));
    }
    let start = parse_window_time(&req.start_time)?;
    let end = parse_window_time(&req.end_time)?;
    if start >= end {
        return Err(ApiError::bad_request("Window start must be before end"));
    }

    let db = state.read().unwrap().db.clone();
    availability_db::insert_window(
        &db,
        public::Window {
            host_id: req.host_id,
            day_of_week: req.day_of_week,
            start_time: req.start_time,
            end_time: req.end_time,
        },
    )
    .await?;

    Ok(Json(json!({ "success": true })))
}

// Create one-off block endpoint
async fn create_block(
    State(state): State<SharedState>,
    Json(req): Json<public::CreateBlockRequest>,
) -> Result<Json<Value>, ApiError> {
    let start = DateTime::parse_from_rfc3339(&req.start_time)
        .map_err(|_| ApiError::bad_request("Invalid start_time, expected RFC3339"))?;
    let end = DateTime::parse_from_rfc3339(&req.end_time)
        .map_err(|_| ApiError::bad_request("Invalid end_time, expected RFC3339"))?;
    if start >= end {
        return Err(ApiError::bad_request("Block start must be before end"));
    }

    let id = Uuid::new_v4().to_string();
    let db = state.read().unwrap().db.clone();
    availability_db::insert_block(
        &db,
        public::Block {
            id: id.clone(),
            host_id: req.host_id,
            start_time: req.start_time,
            end_time: req.end_time,
        },
    )
    .await?;

    Ok(Json(json!({ "success": true, "id": id })))
}

// Delete block endpoint
async fn remove_block(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let db = state.read().unwrap().db.clone();
    let deleted = availability_db::delete_block(&db, &id).await?;
    if !deleted {
        return Err(ApiError::not_found("Block not found"));
    }
    Ok(Json(json!({ "success": true })))
}

/// Create the availability router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(get_availability))
        .route("/windows", post(create_window))
        .route("/blocks", post(create_block))
        .route("/blocks/{id}", delete(remove_block))
}
