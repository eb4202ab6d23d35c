//! Public types for the availability API
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub host_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Window {
    pub host_id: String,
    pub day_of_week: u32,
    /// "HH:MM"
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Block {
    pub id: String,
    pub host_id: String,
    /// RFC3339
    pub start_time: String,
    pub end_time: String,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub windows: Vec<Window>,
    pub blocks: Vec<Block>,
}

#[derive(Deserialize)]
pub struct CreateWindowRequest {
    pub host_id: String,
    pub day_of_week: u32,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Deserialize)]
pub struct CreateBlockRequest {
    pub host_id: String,
    pub start_time: String,
    pub end_time: String,
}
