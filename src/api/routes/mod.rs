//! API routes module

pub mod availability;
pub mod bookings;
pub mod event_types;
pub mod slots;

use std::sync::{Arc, RwLock};

use crate::api::state::AppState;
use axum::Router;

type SharedState = Arc<RwLock<AppState>>;

/// Create the combined API router
pub fn router() -> Router<SharedState> {
    Router::new()
        // Slot listing and the derived month view
        .merge(slots::router())
        // Booking create/reschedule/cancel, plus invitee self-service
        .nest("/bookings", bookings::router())
        .nest("/manage", bookings::manage_router())
        // Event type CRUD
        .nest("/event-types", event_types::router())
        // Availability windows and blocks
        .nest("/availability", availability::router())
}
