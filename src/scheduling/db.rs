//! Data-store queries backing the slot generator and host selector
use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, NaiveTime, SecondsFormat, Utc};
use tokio_rusqlite::Connection;

use super::interval::Interval;

/// Instants are stored as RFC3339 UTC strings with whole seconds so
/// lexicographic comparison in SQL matches chronological order.
pub fn to_db_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_instant(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

/// Recurring weekly availability rules for one host and day-of-week
/// (0 = Sunday). Multiple windows per day are allowed and treated as
/// a union; they are not required to be disjoint.
pub async fn get_availability_windows(
    db: &Connection,
    host_id: &str,
    day_of_week: u32,
) -> Result<Vec<(NaiveTime, NaiveTime)>> {
    let host_id = host_id.to_string();
    let rows = db
        .call(move |conn| {
            let mut stmt = conn.prepare(
                r"
              SELECT start_time, end_time
              FROM availability_windows
              WHERE host_id = ? AND day_of_week = ?
            ",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![host_id, day_of_week], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?;

    let mut windows = Vec::with_capacity(rows.len());
    for (start, end) in rows {
        // Stored as "HH:MM" (seconds tolerated and ignored)
        let start = NaiveTime::parse_from_str(start.get(..5).unwrap_or(&start), "%H:%M")?;
        let end = NaiveTime::parse_from_str(end.get(..5).unwrap_or(&end), "%H:%M")?;
        windows.push((start, end));
    }
    Ok(windows)
}

/// One-off unavailable intervals intersecting the given range.
pub async fn get_blocks(db: &Connection, host_id: &str, range: Interval) -> Result<Vec<Interval>> {
    busy_rows(
        db,
        host_id,
        range,
        "SELECT start_time, end_time FROM blocks WHERE host_id = ?1 AND start_time < ?2 AND end_time > ?3",
    )
    .await
}

/// Non-cancelled bookings intersecting the given range.
pub async fn get_bookings(
    db: &Connection,
    host_id: &str,
    range: Interval,
) -> Result<Vec<Interval>> {
    busy_rows(
        db,
        host_id,
        range,
        r"SELECT start_time, end_time FROM bookings
          WHERE host_id = ?1 AND status != 'cancelled'
            AND start_time < ?2 AND end_time > ?3",
    )
    .await
}

async fn busy_rows(
    db: &Connection,
    host_id: &str,
    range: Interval,
    sql: &'static str,
) -> Result<Vec<Interval>> {
    let host_id = host_id.to_string();
    let range_start = to_db_instant(range.start);
    let range_end = to_db_instant(range.end);
    let rows = db
        .call(move |conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![host_id, range_end, range_start],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?;

    let mut intervals = Vec::with_capacity(rows.len());
    for (start, end) in rows {
        intervals.push(Interval::new(parse_instant(&start)?, parse_instant(&end)?));
    }
    Ok(intervals)
}

/// Count of non-cancelled bookings starting at or after `since`, per
/// host. Hosts with no future bookings are absent from the map.
pub async fn get_future_booking_counts(
    db: &Connection,
    host_ids: &[String],
    since: DateTime<Utc>,
) -> Result<HashMap<String, i64>> {
    if host_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let hosts = host_ids.to_vec();
    let since = to_db_instant(since);
    let counts = db
        .call(move |conn| {
            let placeholders = vec!["?"; hosts.len()].join(",");
            let sql = format!(
                r"SELECT host_id, COUNT(*) FROM bookings
                  WHERE status != 'cancelled' AND start_time >= ? AND host_id IN ({})
                  GROUP BY host_id",
                placeholders
            );
            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::ToSql> = std::iter::once(&since as &dyn rusqlite::ToSql)
                .chain(hosts.iter().map(|h| h as &dyn rusqlite::ToSql))
                .collect();
            let rows = stmt
                .query_map(&params[..], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<Result<HashMap<_, _>, _>>()?;
            Ok(rows)
        })
        .await?;
    Ok(counts)
}

/// Live conflict check against bookings and blocks for `[start, end)`.
/// Used to re-verify a host immediately before a booking write, since
/// the free set computed for the slot listing may be stale by then.
pub async fn host_has_conflict(
    db: &Connection,
    host_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<bool> {
    let host_id = host_id.to_string();
    let start = to_db_instant(start);
    let end = to_db_instant(end);
    let conflict = db
        .call(move |conn| {
            let booking: Option<i64> = conn
                .prepare(
                    r"SELECT 1 FROM bookings
                      WHERE host_id = ?1 AND status != 'cancelled'
                        AND start_time < ?2 AND end_time > ?3
                      LIMIT 1",
                )?
                .query_row(rusqlite::params![host_id, end, start], |row| row.get(0))
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            if booking.is_some() {
                return Ok(true);
            }

            let block: Option<i64> = conn
                .prepare(
                    r"SELECT 1 FROM blocks
                      WHERE host_id = ?1 AND start_time < ?2 AND end_time > ?3
                      LIMIT 1",
                )?
                .query_row(rusqlite::params![host_id, end, start], |row| row.get(0))
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            Ok(block.is_some())
        })
        .await?;
    Ok(conflict)
}
