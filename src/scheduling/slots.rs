//! Host slot generation and per-event-type aggregation
use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio_rusqlite::Connection;

use super::context::{EventType, EventTypeContext, SchedulingMode};
use super::db as scheduling_db;
use super::interval::{Interval, floor_to_second};
use crate::google::CalendarProvider;

/// Candidate start times are walked on a fixed 15-minute grid. This is
/// a policy constant: coarse stepping keeps enumeration cheap and
/// avoids one-minute-offset slot spam.
pub const SLOT_STEP_MINUTES: i64 = 15;

/// A candidate bookable start time with the hosts free at that
/// instant. What "free" means depends on the scheduling mode.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub host_ids: Vec<String>,
}

/// Compute the free start times for one host on one calendar day.
///
/// Busy time is the union of blocks, non-cancelled bookings, and
/// (when `include_external`) whatever the calendar provider reports.
/// A provider failure degrades to "no external busy data" for this
/// host rather than failing the computation: one host's calendar
/// outage must not take down everyone else's availability.
#[allow(clippy::too_many_arguments)]
pub async fn compute_host_slots(
    db: &Connection,
    provider: &dyn CalendarProvider,
    host_id: &str,
    event_type: &EventType,
    day_start: DateTime<Utc>,
    min_start: DateTime<Utc>,
    include_external: bool,
    include_all_day: bool,
) -> Result<BTreeSet<DateTime<Utc>>> {
    let day_end = day_start + Duration::hours(24);
    let day_of_week = day_start.weekday().num_days_from_sunday();

    let windows = scheduling_db::get_availability_windows(db, host_id, day_of_week).await?;
    if windows.is_empty() {
        // No recurring availability that day. Not an error.
        return Ok(BTreeSet::new());
    }

    let day_range = Interval::new(day_start, day_end);
    let mut busy = scheduling_db::get_blocks(db, host_id, day_range).await?;
    busy.extend(scheduling_db::get_bookings(db, host_id, day_range).await?);

    if include_external {
        match provider
            .busy_intervals(host_id, day_start, day_end, include_all_day)
            .await
        {
            Ok(external) => busy.extend(external),
            Err(err) => {
                tracing::warn!(
                    "External calendar fetch failed for host {}, proceeding without it: {}",
                    host_id,
                    err
                );
            }
        }
    }

    let duration = Duration::minutes(event_type.duration_minutes);
    let buffer_before = Duration::minutes(event_type.buffer_before);
    let buffer_after = Duration::minutes(event_type.buffer_after);
    let step = Duration::minutes(SLOT_STEP_MINUTES);

    let mut slots = BTreeSet::new();
    for (window_start, window_end) in windows {
        let window_start = day_start.date_naive().and_time(window_start).and_utc();
        let window_end = day_start.date_naive().and_time(window_end).and_utc();

        let mut cursor = window_start;
        while cursor + duration <= window_end {
            // Buffers pad the bookable interval, not the scan cursor
            let start = cursor + buffer_before;
            let end = start + duration;
            let end_with_buffer = end + buffer_after;
            cursor += step;

            if start < min_start || end_with_buffer > window_end {
                continue;
            }
            let candidate = Interval::new(start, end_with_buffer);
            if busy.iter().any(|span| candidate.overlaps(span)) {
                continue;
            }
            slots.insert(floor_to_second(start));
        }
    }

    Ok(slots)
}

/// Compute the bookable slots for an event type on one calendar day,
/// sorted ascending by start time.
///
/// Solo evaluates only the owning host. Round-robin unions the hosts'
/// free sets (the invitee doesn't pick a host; the selector does
/// later). Collective intersects them: a slot exists only when every
/// host is free. Hosts are evaluated concurrently since they are
/// mutually independent.
pub async fn compute_slots_for_date(
    db: &Connection,
    provider: &dyn CalendarProvider,
    ctx: &EventTypeContext,
    date: NaiveDate,
    skip_external: bool,
    now: DateTime<Utc>,
) -> Result<Vec<Slot>> {
    let day_start = match date.and_hms_opt(0, 0, 0) {
        Some(start) => start.and_utc(),
        None => return Ok(Vec::new()),
    };
    let min_start = now + Duration::minutes(ctx.event_type.min_notice_minutes);

    let mode = ctx.event_type.scheduling_mode;
    let owner = ctx.event_type.owner_host_id.as_ref();
    let hosts_to_evaluate: Vec<String> = match (mode, owner) {
        (SchedulingMode::Solo, Some(owner)) => vec![owner.clone()],
        _ if !ctx.host_ids.is_empty() => ctx.host_ids.clone(),
        (_, Some(owner)) => vec![owner.clone()],
        _ => Vec::new(),
    };
    if hosts_to_evaluate.is_empty() {
        return Ok(Vec::new());
    }

    let per_host = join_all(hosts_to_evaluate.iter().map(|host_id| {
        let include_all_day = ctx.host_preferences.get(host_id).copied().unwrap_or(true);
        async move {
            let result = compute_host_slots(
                db,
                provider,
                host_id,
                &ctx.event_type,
                day_start,
                min_start,
                !skip_external,
                include_all_day,
            )
            .await;
            (host_id.clone(), result)
        }
    }))
    .await;

    let mut slot_map: BTreeMap<DateTime<Utc>, BTreeSet<String>> = BTreeMap::new();

    if mode == SchedulingMode::Collective {
        let mut sets = Vec::with_capacity(per_host.len());
        for (index, (host_id, result)) in per_host.into_iter().enumerate() {
            match result {
                Ok(set) => sets.push(set),
                // The base host's free set is the candidate list;
                // without it there is nothing to intersect against.
                Err(err) if index == 0 => return Err(err),
                Err(err) => {
                    tracing::warn!(
                        "Slot generation failed for host {}, treating as unavailable: {}",
                        host_id,
                        err
                    );
                    sets.push(BTreeSet::new());
                }
            }
        }
        let (base, rest) = sets.split_first().expect("at least one host evaluated");
        for candidate in base {
            if rest.iter().all(|set| set.contains(candidate)) {
                slot_map.insert(*candidate, hosts_to_evaluate.iter().cloned().collect());
            }
        }
    } else {
        for (host_id, result) in per_host {
            let set = match result {
                Ok(set) => set,
                Err(err) => {
                    tracing::warn!(
                        "Slot generation failed for host {}, skipping: {}",
                        host_id,
                        err
                    );
                    continue;
                }
            };
            for start in set {
                slot_map.entry(start).or_default().insert(host_id.clone());
            }
        }
    }

    Ok(slot_map
        .into_iter()
        .map(|(start, hosts)| Slot {
            start,
            host_ids: hosts.into_iter().collect(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::initialize_db;
    use crate::scheduling::context::fetch_event_type_context;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct NoCalendar;

    #[async_trait]
    impl CalendarProvider for NoCalendar {
        async fn busy_intervals(
            &self,
            _host_id: &str,
            _range_start: DateTime<Utc>,
            _range_end: DateTime<Utc>,
            _include_all_day: bool,
        ) -> Result<Vec<Interval>> {
            Ok(Vec::new())
        }
    }

    struct StaticCalendar(Vec<Interval>);

    #[async_trait]
    impl CalendarProvider for StaticCalendar {
        async fn busy_intervals(
            &self,
            _host_id: &str,
            _range_start: DateTime<Utc>,
            _range_end: DateTime<Utc>,
            _include_all_day: bool,
        ) -> Result<Vec<Interval>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenCalendar;

    #[async_trait]
    impl CalendarProvider for BrokenCalendar {
        async fn busy_intervals(
            &self,
            _host_id: &str,
            _range_start: DateTime<Utc>,
            _range_end: DateTime<Utc>,
            _include_all_day: bool,
        ) -> Result<Vec<Interval>> {
            Err(anyhow!("upstream calendar is down"))
        }
    }

    async fn test_db() -> Connection {
        let db = Connection::open_in_memory().await.unwrap();
        db.call(|conn| {
            initialize_db(conn).unwrap();
            Ok(())
        })
        .await
        .unwrap();
        db
    }

    async fn seed_event_type(db: &Connection, mode: &str, duration: i64) {
        db.call({
            let mode = mode.to_string();
            move |conn| {
                conn.execute(
                    r"INSERT INTO event_types
                      (id, name, owner_host_id, duration_minutes, buffer_before,
                       buffer_after, min_notice_minutes, scheduling_mode)
                      VALUES ('et1', 'Intro call', 'host-a', ?1, 0, 0, 0, ?2)",
                    rusqlite::params![duration, mode],
                )?;
                Ok(())
            }
        })
        .await
        .unwrap();
    }

    async fn seed_window(db: &Connection, host: &str, dow: u32, start: &str, end: &str) {
        let (host, start, end) = (host.to_string(), start.to_string(), end.to_string());
        db.call(move |conn| {
            conn.execute(
                r"INSERT INTO availability_windows (host_id, day_of_week, start_time, end_time)
                  VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![host, dow, start, end],
            )?;
            Ok(())
        })
        .await
        .unwrap();
    }

    async fn seed_host(db: &Connection, id: &str) {
        let id = id.to_string();
        db.call(move |conn| {
            conn.execute(
                "INSERT INTO hosts (id, email) VALUES (?1, ?1 || '@example.com')",
                rusqlite::params![id],
            )?;
            Ok(())
        })
        .await
        .unwrap();
    }

    async fn seed_booking(db: &Connection, host: &str, start: &str, end: &str) {
        let (host, start, end) = (host.to_string(), start.to_string(), end.to_string());
        db.call(move |conn| {
            conn.execute(
                r"INSERT INTO bookings
                  (id, host_id, event_type_id, invitee_email, start_time, end_time, manage_token)
                  VALUES (hex(randomblob(8)), ?1, 'et1', 'x@example.com', ?2, ?3, hex(randomblob(8)))",
                rusqlite::params![host, start, end],
            )?;
            Ok(())
        })
        .await
        .unwrap();
    }

    fn day() -> DateTime<Utc> {
        // A Monday
        Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap()
    }

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap()
    }

    fn solo_event(duration: i64) -> EventType {
        EventType {
            id: "et1".to_string(),
            name: "Intro call".to_string(),
            owner_host_id: Some("host-a".to_string()),
            duration_minutes: duration,
            buffer_before: 0,
            buffer_after: 0,
            min_notice_minutes: 0,
            scheduling_mode: SchedulingMode::Solo,
            team_id: None,
        }
    }

    #[tokio::test]
    async fn simple_solo_day_enumerates_the_grid() {
        let db = test_db().await;
        seed_window(&db, "host-a", 1, "09:00", "17:00").await;

        let slots = compute_host_slots(
            &db,
            &NoCalendar,
            "host-a",
            &solo_event(30),
            day(),
            epoch(),
            false,
            true,
        )
        .await
        .unwrap();

        // 09:00 through 16:30 on the 15-minute grid
        assert_eq!(slots.len(), 31);
        assert_eq!(slots.first(), Some(&at(9, 0)));
        assert_eq!(slots.last(), Some(&at(16, 30)));
    }

    #[tokio::test]
    async fn no_windows_means_no_slots() {
        let db = test_db().await;
        let slots = compute_host_slots(
            &db,
            &NoCalendar,
            "host-a",
            &solo_event(30),
            day(),
            epoch(),
            false,
            true,
        )
        .await
        .unwrap();
        assert!(slots.is_empty());
    }

    #[tokio::test]
    async fn booking_excludes_overlapping_starts_but_not_touching() {
        let db = test_db().await;
        seed_window(&db, "host-a", 1, "09:00", "17:00").await;
        seed_booking(&db, "host-a", "2025-06-02T10:00:00Z", "2025-06-02T10:30:00Z").await;

        let slots = compute_host_slots(
            &db,
            &NoCalendar,
            "host-a",
            &solo_event(30),
            day(),
            epoch(),
            false,
            true,
        )
        .await
        .unwrap();

        // Starts whose [start, start+30) intersects [10:00, 10:30)
        assert!(!slots.contains(&at(9, 45)));
        assert!(!slots.contains(&at(10, 0)));
        assert!(!slots.contains(&at(10, 15)));
        // Ends exactly at 10:00, touching is allowed
        assert!(slots.contains(&at(9, 30)));
        // Starts exactly at 10:30, touching is allowed
        assert!(slots.contains(&at(10, 30)));
        assert_eq!(slots.len(), 28);
    }

    #[tokio::test]
    async fn buffers_shrink_the_usable_window() {
        let db = test_db().await;
        seed_window(&db, "host-a", 1, "09:00", "10:00").await;

        let mut event = solo_event(30);
        event.buffer_before = 15;
        event.buffer_after = 15;

        let slots = compute_host_slots(
            &db, &NoCalendar, "host-a", &event, day(), epoch(), false, true,
        )
        .await
        .unwrap();

        // Only cursor 09:00 fits: booked 09:15-09:45, padded to 10:00
        assert_eq!(slots.into_iter().collect::<Vec<_>>(), vec![at(9, 15)]);
    }

    #[tokio::test]
    async fn minimum_notice_cuts_off_early_starts() {
        let db = test_db().await;
        seed_window(&db, "host-a", 1, "09:00", "17:00").await;

        let slots = compute_host_slots(
            &db,
            &NoCalendar,
            "host-a",
            &solo_event(30),
            day(),
            at(12, 0),
            false,
            true,
        )
        .await
        .unwrap();

        assert_eq!(slots.first(), Some(&at(12, 0)));
        assert!(slots.iter().all(|start| *start >= at(12, 0)));
    }

    #[tokio::test]
    async fn external_busy_intervals_block_slots() {
        let db = test_db().await;
        seed_window(&db, "host-a", 1, "09:00", "11:00").await;

        let provider = StaticCalendar(vec![Interval::new(at(9, 0), at(10, 0))]);
        let slots = compute_host_slots(
            &db,
            &provider,
            "host-a",
            &solo_event(30),
            day(),
            epoch(),
            true,
            true,
        )
        .await
        .unwrap();

        assert_eq!(
            slots.into_iter().collect::<Vec<_>>(),
            vec![at(10, 0), at(10, 15), at(10, 30)]
        );
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_no_external_busy_data() {
        let db = test_db().await;
        seed_window(&db, "host-a", 1, "09:00", "10:00").await;

        let slots = compute_host_slots(
            &db,
            &BrokenCalendar,
            "host-a",
            &solo_event(30),
            day(),
            epoch(),
            true,
            true,
        )
        .await
        .unwrap();

        assert_eq!(slots.len(), 3);
    }

    #[tokio::test]
    async fn generator_is_idempotent() {
        let db = test_db().await;
        seed_window(&db, "host-a", 1, "09:00", "17:00").await;
        seed_booking(&db, "host-a", "2025-06-02T13:00:00Z", "2025-06-02T14:00:00Z").await;

        let first = compute_host_slots(
            &db,
            &NoCalendar,
            "host-a",
            &solo_event(30),
            day(),
            epoch(),
            false,
            true,
        )
        .await
        .unwrap();
        let second = compute_host_slots(
            &db,
            &NoCalendar,
            "host-a",
            &solo_event(30),
            day(),
            epoch(),
            false,
            true,
        )
        .await
        .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn round_robin_unions_per_host_free_sets() {
        let db = test_db().await;
        seed_event_type(&db, "round_robin", 30).await;
        seed_host(&db, "host-a").await;
        seed_host(&db, "host-b").await;
        db.call(|conn| {
            conn.execute_batch(
                r"INSERT INTO event_type_hosts VALUES ('et1', 'host-a');
                  INSERT INTO event_type_hosts VALUES ('et1', 'host-b');",
            )?;
            Ok(())
        })
        .await
        .unwrap();
        // Host A free at 14:00 only; host B at 14:00 and 14:30 (two
        // windows, exercising the union of windows per day)
        seed_window(&db, "host-a", 1, "14:00", "14:30").await;
        seed_window(&db, "host-b", 1, "14:00", "14:30").await;
        seed_window(&db, "host-b", 1, "14:30", "15:00").await;

        let ctx = fetch_event_type_context(&db, "et1").await.unwrap().unwrap();
        let slots = compute_slots_for_date(&db, &NoCalendar, &ctx, day().date_naive(), true, epoch())
            .await
            .unwrap();

        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].start, at(14, 0));
        assert_eq!(slots[0].host_ids, vec!["host-a", "host-b"]);
        assert_eq!(slots[1].start, at(14, 30));
        assert_eq!(slots[1].host_ids, vec!["host-b"]);
    }

    #[tokio::test]
    async fn collective_intersects_per_host_free_sets() {
        let db = test_db().await;
        seed_event_type(&db, "collective", 15).await;
        seed_host(&db, "host-a").await;
        seed_host(&db, "host-b").await;
        db.call(|conn| {
            conn.execute_batch(
                r"INSERT INTO event_type_hosts VALUES ('et1', 'host-a');
                  INSERT INTO event_type_hosts VALUES ('et1', 'host-b');",
            )?;
            Ok(())
        })
        .await
        .unwrap();
        // A free at {9:00, 9:15}, B free at {9:15, 9:30}
        seed_window(&db, "host-a", 1, "09:00", "09:30").await;
        seed_window(&db, "host-b", 1, "09:15", "09:45").await;

        let ctx = fetch_event_type_context(&db, "et1").await.unwrap().unwrap();
        let slots = compute_slots_for_date(&db, &NoCalendar, &ctx, day().date_naive(), true, epoch())
            .await
            .unwrap();

        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start, at(9, 15));
        assert_eq!(slots[0].host_ids, vec!["host-a", "host-b"]);
    }

    #[tokio::test]
    async fn owner_is_the_default_host_set() {
        let db = test_db().await;
        seed_event_type(&db, "round_robin", 30).await;
        seed_host(&db, "host-a").await;
        seed_window(&db, "host-a", 1, "09:00", "10:00").await;

        let ctx = fetch_event_type_context(&db, "et1").await.unwrap().unwrap();
        // Owner is the only member of the host set
        assert_eq!(ctx.host_ids, vec!["host-a"]);

        let slots = compute_slots_for_date(&db, &NoCalendar, &ctx, day().date_naive(), true, epoch())
            .await
            .unwrap();
        assert_eq!(slots.len(), 3);
        assert!(slots.iter().all(|s| s.host_ids == vec!["host-a"]));
    }
}
