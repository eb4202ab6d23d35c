//! Database queries for the event types API
use anyhow::Result;
use tokio_rusqlite::Connection;

use crate::scheduling::{EventType, SchedulingMode};

const EVENT_TYPE_COLUMNS: &str = r"
  id,
  name,
  owner_host_id,
  duration_minutes,
  buffer_before,
  buffer_after,
  min_notice_minutes,
  scheduling_mode,
  team_id
";

fn event_type_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventType> {
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
}

pub async fn list_event_types(db: &Connection) -> Result<Vec<EventType>> {
    let event_types = db
        .call(|conn| {
            let sql = format!("SELECT {} FROM event_types ORDER BY name", EVENT_TYPE_COLUMNS);
            let rows = conn
                .prepare(&sql)?
                .query_map([], event_type_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?;
    Ok(event_types)
}

pub async fn get_event_type(db: &Connection, id: &str) -> Result<Option<EventType>> {
    let id = id.to_string();
    let event_type = db
        .call(move |conn| {
            let sql = format!(
                "SELECT {} FROM event_types WHERE id = ? LIMIT 1",
                EVENT_TYPE_COLUMNS
            );
            let result = conn
                .prepare(&sql)?
                .query_row([&id], event_type_from_row)
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            Ok(result)
        })
        .await?;
    Ok(event_type)
}

pub async fn insert_event_type(
    db: &Connection,
    event_type: EventType,
    host_ids: Vec<String>,
) -> Result<()> {
    db.call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
            r"INSERT INTO event_types
              (id, name, owner_host_id, duration_minutes, buffer_before, buffer_after,
               min_notice_minutes, scheduling_mode, team_id)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                event_type.id,
                event_type.name,
                event_type.owner_host_id,
                event_type.duration_minutes,
                event_type.buffer_before,
                event_type.buffer_after,
                event_type.min_notice_minutes,
                event_type.scheduling_mode.as_str(),
                event_type.team_id,
            ],
        )?;
        for host_id in &host_ids {
            tx.execute(
                "INSERT OR IGNORE INTO event_type_hosts (event_type_id, host_id) VALUES (?1, ?2)",
                rusqlite::params![event_type.id, host_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    })
    .await?;
    Ok(())
}

pub async fn update_event_type(
    db: &Connection,
    event_type: EventType,
    host_ids: Option<Vec<String>>,
) -> Result<()> {
    db.call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
            r"UPDATE event_types SET
                name = ?2,
                duration_minutes = ?3,
                buffer_before = ?4,
                buffer_after = ?5,
                min_notice_minutes = ?6,
                scheduling_mode = ?7
              WHERE id = ?1",
            rusqlite::params![
                event_type.id,
                event_type.name,
                event_type.duration_minutes,
                event_type.buffer_before,
                event_type.buffer_after,
                event_type.min_notice_minutes,
                event_type.scheduling_mode.as_str(),
            ],
        )?;
        if let Some(host_ids) = host_ids {
            tx.execute(
                "DELETE FROM event_type_hosts WHERE event_type_id = ?",
                rusqlite::params![event_type.id],
            )?;
            for host_id in &host_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO event_type_hosts (event_type_id, host_id) VALUES (?1, ?2)",
                    rusqlite::params![event_type.id, host_id],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    })
    .await?;
    Ok(())
}

pub async fn delete_event_type(db: &Connection, id: &str) -> Result<()> {
    let id = id.to_string();
    db.call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM event_type_hosts WHERE event_type_id = ?",
            rusqlite::params![id],
        )?;
        tx.execute("DELETE FROM event_types WHERE id = ?", rusqlite::params![id])?;
        tx.commit()?;
        Ok(())
    })
    .await?;
    Ok(())
}
