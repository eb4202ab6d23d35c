//! Public types for the bookings API
use serde::{Deserialize, Serialize};

/// A persisted booking. Instants are RFC3339 UTC strings, matching
/// storage so responses round-trip without re-parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub host_id: String,
    pub event_type_id: String,
    pub invitee_email: String,
    pub invitee_name: Option<String>,
    pub notes: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub manage_token: String,
    pub external_event_id: Option<String>,
    pub status: String,
}

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub event_type_id: String,
    pub invitee_email: String,
    /// Requested slot start, RFC3339
    pub start_time: String,
    pub invitee_name: Option<String>,
    pub notes: Option<String>,
    /// Optional host preference; honored only if that host is still
    /// eligible and conflict-free
    pub host_id: Option<String>,
}

#[derive(Deserialize)]
pub struct RescheduleRequest {
    pub start_time: String,
    pub host_id: Option<String>,
}

#[derive(Serialize)]
pub struct BookingResponse {
    pub booking: Booking,
}

#[derive(Serialize)]
pub struct BookingListResponse {
    pub bookings: Vec<Booking>,
}
