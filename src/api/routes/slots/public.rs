//! Public types for the slots API
use serde::{Deserialize, Serialize};

use crate::scheduling::Slot;

#[derive(Deserialize)]
pub struct SlotsQuery {
    pub event_type_id: String,
    /// Calendar day, YYYY-MM-DD (UTC)
    pub date: String,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    pub slots: Vec<Slot>,
}

#[derive(Deserialize)]
pub struct AvailableDaysQuery {
    pub event_type_id: String,
    /// Calendar month, YYYY-MM
    pub month: String,
}

#[derive(Serialize)]
pub struct AvailableDaysResponse {
    pub days: Vec<String>,
}
