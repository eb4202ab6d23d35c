//! Router for the bookings API
//!
//! Booking writes follow a two-stage defense against double-booking:
//! recompute the day's slots and require the requested start to still
//! be present, then let the host selector re-verify conflicts right
//! before the insert. This is best-effort, not transactional; losing
//! the race surfaces as a 409 and the invitee picks another time.

use std::sync::{Arc, RwLock};

use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::{get, put},
};
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use super::db as bookings_db;
use super::public::{
    Booking, BookingListResponse, BookingResponse, CreateBookingRequest, RescheduleRequest,
};
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::core::AppConfig;
use crate::google::{CalendarProvider, EventWrite};
use crate::notify::{Mailer, generate_ics};
use crate::scheduling::db::to_db_instant;
use crate::scheduling::{
    AvailableDaysCache, EventTypeContext, SchedulingMode, compute_slots_for_date,
    fetch_event_type_context, floor_to_second, select_host_for_slot,
};

type SharedState = Arc<RwLock<AppState>>;

/// Per-request snapshot of the collaborators a booking write touches.
struct Services {
    db: tokio_rusqlite::Connection,
    calendar: Arc<dyn CalendarProvider>,
    mailer: Arc<Mailer>,
    cache: Arc<AvailableDaysCache>,
    config: AppConfig,
}

fn services(state: &SharedState) -> Services {
    let shared_state = state.read().unwrap();
    Services {
        db: shared_state.db.clone(),
        calendar: shared_state.calendar.clone(),
        mailer: shared_state.mailer.clone(),
        cache: shared_state.days_cache.clone(),
        config: shared_state.config.clone(),
    }
}

fn new_manage_token() -> String {
    // Two v4 uuids' worth of randomness, hex, no separators
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn event_description(invitee: &str, notes: Option<&str>) -> String {
    let mut description = format!("Meeting with {}", invitee);
    if let Some(notes) = notes {
        if !notes.is_empty() {
            description.push_str("\n\nBackground:\n");
            description.push_str(notes);
        }
    }
    description
}

/// Re-parse and revalidate a requested start time against a freshly
/// computed slot list. Returns the normalized `[start, end)` interval
/// and the hosts eligible at that instant.
async fn revalidate_slot(
    svc: &Services,
    ctx: &EventTypeContext,
    raw_start: &str,
) -> Result<(DateTime<Utc>, DateTime<Utc>, Vec<String>), ApiError> {
    let parsed = DateTime::parse_from_rfc3339(raw_start)
        .map_err(|_| ApiError::bad_request("Invalid start_time, expected RFC3339"))?;
    let start = floor_to_second(parsed.with_timezone(&Utc));
    let end = start + Duration::minutes(ctx.event_type.duration_minutes);

    let slots = compute_slots_for_date(
        &svc.db,
        svc.calendar.as_ref(),
        ctx,
        start.date_naive(),
        false,
        Utc::now(),
    )
    .await?;

    let slot = slots
        .into_iter()
        .find(|slot| slot.start == start)
        .ok_or_else(|| ApiError::conflict("Selected time is no longer available"))?;

    Ok((start, end, slot.host_ids))
}

fn manage_url(config: &AppConfig, token: &str) -> String {
    format!("{}/manage/{}", config.app_origin, token)
}

async fn notify_booking_created(svc: &Services, ctx: &EventTypeContext, booking: &Booking) {
    let start = booking.start_time.clone();
    let ics = generate_ics(
        DateTime::parse_from_rfc3339(&booking.start_time)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        DateTime::parse_from_rfc3339(&booking.end_time)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        &ctx.event_type.name,
        &event_description(
            booking.invitee_name.as_deref().unwrap_or(&booking.invitee_email),
            booking.notes.as_deref(),
        ),
        &booking.invitee_email,
        booking.invitee_name.as_deref(),
    );

    let url = manage_url(&svc.config, &booking.manage_token);
    svc.mailer
        .try_send(
            &booking.invitee_email,
            "Your booking is confirmed",
            &format!("Your meeting is scheduled for {}.\nManage: {}", start, url),
            &ics,
        )
        .await;

    match bookings_db::get_host_email(&svc.db, &booking.host_id).await {
        Ok(Some(host_email)) => {
            svc.mailer
                .try_send(
                    &host_email,
                    "New booking",
                    &format!("New booking with {} at {}.", booking.invitee_email, start),
                    &ics,
                )
                .await;
        }
        Ok(None) => {}
        Err(err) => tracing::warn!("Host email lookup failed: {}", err),
    }
}

async fn notify_booking_moved(
    svc: &Services,
    ctx: &EventTypeContext,
    booking: &Booking,
    previous_host: &str,
) {
    let start = booking.start_time.clone();
    let ics = generate_ics(
        DateTime::parse_from_rfc3339(&booking.start_time)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        DateTime::parse_from_rfc3339(&booking.end_time)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        &ctx.event_type.name,
        &event_description(
            booking.invitee_name.as_deref().unwrap_or(&booking.invitee_email),
            booking.notes.as_deref(),
        ),
        &booking.invitee_email,
        booking.invitee_name.as_deref(),
    );

    let url = manage_url(&svc.config, &booking.manage_token);
    svc.mailer
        .try_send(
            &booking.invitee_email,
            "Booking updated",
            &format!("Your meeting is now on {}.\nManage: {}", start, url),
            &ics,
        )
        .await;

    // The previous host loses the booking, the (possibly same) new
    // host gets the update
    if previous_host != booking.host_id {
        if let Ok(Some(email)) = bookings_db::get_host_email(&svc.db, previous_host).await {
            svc.mailer
                .try_send(
                    &email,
                    "Booking reassigned",
                    &format!("Booking with {} moved to {}.", booking.invitee_email, start),
                    &ics,
                )
                .await;
        }
    }
    if let Ok(Some(email)) = bookings_db::get_host_email(&svc.db, &booking.host_id).await {
        svc.mailer
            .try_send(
                &email,
                "Updated booking",
                &format!("Booking with {} moved to {}.", booking.invitee_email, start),
                &ics,
            )
            .await;
    }
}

// List bookings endpoint (host dashboard)
async fn list_bookings(
    State(state): State<SharedState>,
) -> Result<Json<BookingListResponse>, ApiError> {
    let db = state.read().unwrap().db.clone();
    let bookings = bookings_db::list_bookings(&db).await?;
    Ok(Json(BookingListResponse { bookings }))
}

// Create booking endpoint
async fn create_booking(
    State(state): State<SharedState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    if !req.invitee_email.contains('@') {
        return Err(ApiError::bad_request("Invalid invitee_email"));
    }

    let svc = services(&state);
    let ctx = fetch_event_type_context(&svc.db, &req.event_type_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event type not found"))?;

    let (start, end, slot_hosts) = revalidate_slot(&svc, &ctx, &req.start_time).await?;

    let chosen_host = select_host_for_slot(
        &svc.db,
        &ctx,
        &slot_hosts,
        start,
        end,
        req.host_id.as_deref(),
        Utc::now(),
    )
    .await?
    .ok_or_else(|| ApiError::conflict("No host available for this time"))?;

    let mut booking = Booking {
        id: Uuid::new_v4().to_string(),
        host_id: chosen_host,
        event_type_id: req.event_type_id.clone(),
        invitee_email: req.invitee_email,
        invitee_name: req.invitee_name,
        notes: req.notes,
        start_time: to_db_instant(start),
        end_time: to_db_instant(end),
        manage_token: new_manage_token(),
        external_event_id: None,
        status: "confirmed".to_string(),
    };
    bookings_db::insert_booking(&svc.db, booking.clone()).await?;
    svc.cache.invalidate_event_type(&req.event_type_id);

    // Write-through to the host's calendar, best effort
    let event = EventWrite {
        summary: ctx.event_type.name.clone(),
        description: event_description(
            booking.invitee_name.as_deref().unwrap_or(&booking.invitee_email),
            booking.notes.as_deref(),
        ),
        start,
        end,
        attendee_email: booking.invitee_email.clone(),
        attendee_name: booking.invitee_name.clone(),
    };
    match svc.calendar.insert_event(&booking.host_id, event).await {
        Ok(Some(event_id)) => {
            bookings_db::set_external_event_id(&svc.db, &booking.id, Some(event_id.clone()))
                .await?;
            booking.external_event_id = Some(event_id);
        }
        Ok(None) => {}
        Err(err) => tracing::warn!("Calendar event insert failed: {}", err),
    }

    notify_booking_created(&svc, &ctx, &booking).await;

    Ok(Json(BookingResponse { booking }))
}

/// Shared reschedule path for both the id route and the invitee
/// manage-token route.
async fn apply_reschedule(
    svc: &Services,
    booking: Booking,
    req: RescheduleRequest,
) -> Result<Booking, ApiError> {
    if booking.status == "cancelled" {
        return Err(ApiError::conflict("Booking is cancelled"));
    }

    let ctx = fetch_event_type_context(&svc.db, &booking.event_type_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event type not found"))?;

    if ctx.event_type.scheduling_mode == SchedulingMode::Collective {
        return Err(ApiError::bad_request(
            "Collective event types cannot be rescheduled yet",
        ));
    }

    let (start, end, slot_hosts) = revalidate_slot(svc, &ctx, &req.start_time).await?;

    let preferred = req.host_id.clone().unwrap_or_else(|| booking.host_id.clone());
    let chosen_host = select_host_for_slot(
        &svc.db,
        &ctx,
        &slot_hosts,
        start,
        end,
        Some(&preferred),
        Utc::now(),
    )
    .await?
    .ok_or_else(|| ApiError::conflict("No host available for this time"))?;

    bookings_db::update_booking_times(
        &svc.db,
        &booking.id,
        &chosen_host,
        &to_db_instant(start),
        &to_db_instant(end),
    )
    .await?;
    svc.cache.invalidate_event_type(&booking.event_type_id);

    let previous_host = booking.host_id.clone();
    let mut external_event_id = booking.external_event_id.clone();

    // Keep the host's calendar in sync: move the event in place when
    // the host is unchanged, otherwise recreate it on the new host's
    // calendar. All best effort.
    match &booking.external_event_id {
        Some(event_id) if previous_host == chosen_host => {
            if let Err(err) = svc
                .calendar
                .update_event(&chosen_host, event_id, start, end)
                .await
            {
                tracing::warn!("Calendar event update failed: {}", err);
            }
        }
        maybe_event => {
            if let Some(event_id) = maybe_event {
                if let Err(err) = svc.calendar.delete_event(&previous_host, event_id).await {
                    tracing::warn!("Calendar event delete failed: {}", err);
                }
            }
            let event = EventWrite {
                summary: ctx.event_type.name.clone(),
                description: event_description(
                    booking.invitee_name.as_deref().unwrap_or(&booking.invitee_email),
                    booking.notes.as_deref(),
                ),
                start,
                end,
                attendee_email: booking.invitee_email.clone(),
                attendee_name: booking.invitee_name.clone(),
            };
            external_event_id = match svc.calendar.insert_event(&chosen_host, event).await {
                Ok(id) => id,
                Err(err) => {
                    tracing::warn!("Calendar event insert failed: {}", err);
                    None
                }
            };
            bookings_db::set_external_event_id(&svc.db, &booking.id, external_event_id.clone())
                .await?;
        }
    }

    let updated = Booking {
        host_id: chosen_host,
        start_time: to_db_instant(start),
        end_time: to_db_instant(end),
        external_event_id,
        ..booking
    };

    notify_booking_moved(svc, &ctx, &updated, &previous_host).await;

    Ok(updated)
}

/// Shared cancel path. The row is kept with status `cancelled` so the
/// manage link keeps resolving, but it stops accepting writes.
async fn apply_cancel(svc: &Services, booking: Booking) -> Result<Json<Value>, ApiError> {
    if booking.status == "cancelled" {
        return Err(ApiError::conflict("Booking is already cancelled"));
    }

    bookings_db::cancel_booking(&svc.db, &booking.id).await?;
    svc.cache.invalidate_event_type(&booking.event_type_id);

    if let Some(event_id) = &booking.external_event_id {
        if let Err(err) = svc.calendar.delete_event(&booking.host_id, event_id).await {
            tracing::warn!("Calendar event delete failed: {}", err);
        }
        // The calendar event is gone; drop the reference so nothing
        // can write to it later
        bookings_db::set_external_event_id(&svc.db, &booking.id, None).await?;
    }

    Ok(Json(json!({ "success": true })))
}

// Reschedule by booking id
async fn reschedule_booking(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<RescheduleRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    let svc = services(&state);
    let booking = bookings_db::get_booking_by_id(&svc.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Booking not found"))?;
    let booking = apply_reschedule(&svc, booking, req).await?;
    Ok(Json(BookingResponse { booking }))
}

// Cancel by booking id
async fn cancel_booking(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let svc = services(&state);
    let booking = bookings_db::get_booking_by_id(&svc.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Booking not found"))?;
    apply_cancel(&svc, booking).await
}

// Invitee self-service lookup by manage token
async fn manage_get(
    State(state): State<SharedState>,
    Path(token): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let db = state.read().unwrap().db.clone();
    let booking = bookings_db::get_booking_by_token(&db, &token)
        .await?
        .ok_or_else(|| ApiError::not_found("Booking not found"))?;
    Ok(Json(BookingResponse { booking }))
}

async fn manage_reschedule(
    State(state): State<SharedState>,
    Path(token): Path<String>,
    Json(req): Json<RescheduleRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    let svc = services(&state);
    let booking = bookings_db::get_booking_by_token(&svc.db, &token)
        .await?
        .ok_or_else(|| ApiError::not_found("Booking not found"))?;
    let booking = apply_reschedule(&svc, booking, req).await?;
    Ok(Json(BookingResponse { booking }))
}

async fn manage_cancel(
    State(state): State<SharedState>,
    Path(token): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let svc = services(&state);
    let booking = bookings_db::get_booking_by_token(&svc.db, &token)
        .await?
        .ok_or_else(|| ApiError::not_found("Booking not found"))?;
    apply_cancel(&svc, booking).await
}

/// Create the bookings router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_bookings).post(create_booking))
        .route("/{id}", put(reschedule_booking).delete(cancel_booking))
}

/// Create the invitee self-service router
pub fn manage_router() -> Router<SharedState> {
    Router::new().route(
        "/{token}",
        get(manage_get).put(manage_reschedule).delete(manage_cancel),
    )
}
