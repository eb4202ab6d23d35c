//! Event type context loading
//!
//! Loads the event type configuration and the set of eligible hosts.
//! The output shape here is the input contract for the slot generator
//! and host selector; rows are validated into typed records at this
//! boundary so the engine never sees partially-shaped data.
use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::Connection;

/// How multiple hosts on one event type are aggregated. Dispatched
/// once at the aggregator's entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingMode {
    Solo,
    RoundRobin,
    Collective,
}

impl SchedulingMode {
    /// Parse the stored mode string. Unknown values fall back to solo,
    /// matching rows written before multi-host modes existed.
    pub fn parse(value: &str) -> Self {
        match value {
            "round_robin" => SchedulingMode::RoundRobin,
            "collective" => SchedulingMode::Collective,
            _ => SchedulingMode::Solo,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulingMode::Solo => "solo",
            SchedulingMode::RoundRobin => "round_robin",
            SchedulingMode::Collective => "collective",
        }
    }
}

/// A host-defined booking template.
#[derive(Debug, Clone, Serialize)]
pub struct EventType {
    pub id: String,
    pub name: String,
    pub owner_host_id: Option<String>,
    pub duration_minutes: i64,
    pub buffer_before: i64,
    pub buffer_after: i64,
    pub min_notice_minutes: i64,
    pub scheduling_mode: SchedulingMode,
    pub team_id: Option<String>,
}

/// Read-only per-request snapshot of an event type and its hosts.
#[derive(Debug, Clone)]
pub struct EventTypeContext {
    pub event_type: EventType,
    pub host_ids: Vec<String>,
    /// Whether all-day external calendar entries count as busy,
    /// per host. Defaults to true.
    pub host_preferences: HashMap<String, bool>,
}

/// Fetch the event type plus its host set and preferences. Returns
/// `Ok(None)` when the event type doesn't exist so the API boundary
/// can respond 404 rather than 500.
pub async fn fetch_event_type_context(
    db: &Connection,
    event_type_id: &str,
) -> Result<Option<EventTypeContext>> {
    let id = event_type_id.to_string();
    let loaded = db
        .call(move |conn| {
            let event_type = {
                let mut stmt = conn.prepare(
                    r"
                  SELECT
                    id,
                    name,
                    owner_host_id,
                    duration_minutes,
                    buffer_before,
                    buffer_after,
                    min_notice_minutes,
                    scheduling_mode,
                    team_id
                  FROM event_types
                  WHERE id = ?
                ",
                )?;
                let mut rows = stmt.query_map([&id], |row| {
                    let mode: String = row.get(7)?;
                    Ok(EventType {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        owner_host_id: row.get(2)?,
                        duration_minutes: row.get(3)?,
                        buffer_before: row.get(4)?,
                        buffer_after: row.get(5)?,
                        min_notice_minutes: row.get(6)?,
                        scheduling_mode: SchedulingMode::parse(&mode),
                        team_id: row.get(8)?,
                    })
                })?;
                match rows.next() {
                    Some(row) => row?,
                    None => return Ok(None),
                }
            };

            // Host set is the owner plus any explicitly assigned hosts,
            // deduplicated but keeping the owner first.
            let mut host_ids: Vec<String> = Vec::new();
            if let Some(owner) = &event_type.owner_host_id {
                host_ids.push(owner.clone());
            }
            let mut stmt = conn.prepare(
                "SELECT host_id FROM event_type_hosts WHERE event_type_id = ?",
            )?;
            let extra = stmt.query_map([&event_type.id], |row| row.get::<_, String>(0))?;
            for host in extra {
                let host = host?;
                if !host_ids.contains(&host) {
                    host_ids.push(host);
                }
            }

            let mut host_preferences: HashMap<String, bool> =
                host_ids.iter().map(|id| (id.clone(), true)).collect();
            if !host_ids.is_empty() {
                let placeholders = vec!["?"; host_ids.len()].join(",");
                let sql = format!(
                    "SELECT id, include_all_day_blocks FROM hosts WHERE id IN ({})",
                    placeholders
                );
                let mut stmt = conn.prepare(&sql)?;
                let prefs = stmt.query_map(
                    rusqlite::params_from_iter(host_ids.iter()),
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                )?;
                for pref in prefs {
                    let (host, include) = pref?;
                    if include == 0 {
                        host_preferences.insert(host, false);
                    }
                }
            }

            Ok(Some(EventTypeContext {
                event_type,
                host_ids,
                host_preferences,
            }))
        })
        .await?;

    Ok(loaded)
}
