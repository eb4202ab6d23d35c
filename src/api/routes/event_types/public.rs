//! Public types for the event types API
use serde::{Deserialize, Serialize};

use crate::scheduling::EventType;

#[derive(Deserialize, Default)]
pub struct EventTypeQuery {
    pub id: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateEventTypeRequest {
    pub name: String,
    pub duration_minutes: i64,
    pub owner_host_id: Option<String>,
    pub buffer_before: Option<i64>,
    pub buffer_after: Option<i64>,
    pub min_notice_minutes: Option<i64>,
    pub scheduling_mode: Option<String>,
    pub team_id: Option<String>,
    /// Hosts beyond the owner, for multi-host modes
    pub host_ids: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct UpdateEventTypeRequest {
    pub id: String,
    pub name: Option<String>,
    pub duration_minutes: Option<i64>,
    pub buffer_before: Option<i64>,
    pub buffer_after: Option<i64>,
    pub min_notice_minutes: Option<i64>,
    pub scheduling_mode: Option<String>,
    pub host_ids: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct DeleteEventTypeRequest {
    pub id: String,
}

#[derive(Serialize)]
pub struct EventTypeResponse {
    pub event_type: EventType,
}

#[derive(Serialize)]
pub struct EventTypeListResponse {
    pub event_types: Vec<EventType>,
}
