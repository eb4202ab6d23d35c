//! Round-robin host selection for booking commits
use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio_rusqlite::Connection;

use super::context::{EventTypeContext, SchedulingMode};
use super::db as scheduling_db;

/// Pick the host that will serve a booking at `[slot_start, slot_end)`.
///
/// Eligibility computed during slot listing may be stale by the time
/// the booking write happens, so every candidate is re-verified with a
/// live conflict check before being returned. `Ok(None)` means no host
/// is conflict-free anymore and the caller must report the slot as no
/// longer available.
///
/// A preferred host (e.g. the current host on a reschedule) wins as
/// long as it is eligible and conflict-free, preserving continuity
/// without sacrificing correctness. Everyone else is ranked by
/// ascending count of future non-cancelled bookings, ties broken by
/// host id, so selection is deterministic for a given snapshot.
pub async fn select_host_for_slot(
    db: &Connection,
    ctx: &EventTypeContext,
    slot_hosts: &[String],
    slot_start: DateTime<Utc>,
    slot_end: DateTime<Utc>,
    preferred_host: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<String>> {
    if ctx.event_type.scheduling_mode == SchedulingMode::Solo {
        let host = ctx
            .event_type
            .owner_host_id
            .clone()
            .or_else(|| ctx.host_ids.first().cloned());
        return Ok(host);
    }

    let mut candidates: Vec<String> = Vec::new();
    for host in slot_hosts {
        if !host.is_empty() && !candidates.contains(host) {
            candidates.push(host.clone());
        }
    }
    if candidates.is_empty() {
        candidates = ctx.host_ids.clone();
    }
    if candidates.is_empty() {
        if let Some(owner) = &ctx.event_type.owner_host_id {
            candidates.push(owner.clone());
        }
    }
    if candidates.is_empty() {
        return Ok(None);
    }

    if let Some(preferred) = preferred_host {
        if candidates.iter().any(|c| c == preferred)
            && !scheduling_db::host_has_conflict(db, preferred, slot_start, slot_end).await?
        {
            return Ok(Some(preferred.to_string()));
        }
    }

    // Only forward-looking load counts; cancelled bookings are excluded.
    let counts = scheduling_db::get_future_booking_counts(db, &candidates, now).await?;
    candidates.sort_by(|a, b| {
        let count_a = counts.get(a).copied().unwrap_or(0);
        let count_b = counts.get(b).copied().unwrap_or(0);
        count_a.cmp(&count_b).then_with(|| a.cmp(b))
    });

    for host in candidates {
        if !scheduling_db::host_has_conflict(db, &host, slot_start, slot_end).await? {
            return Ok(Some(host));
        }
    }

    Ok(None)
}
