//! Database queries for the availability API
use anyhow::Result;
use tokio_rusqlite::Connection;

use super::public::{Block, Window};

pub async fn list_windows(db: &Connection, host_id: &str) -> Result<Vec<Window>> {
    let host_id = host_id.to_string();
    let windows = db
        .call(move |conn| {
            let rows = conn
                .prepare(
                    r"SELECT host_id, day_of_week, start_time, end_time
                      FROM availability_windows
                      WHERE host_id = ?
                      ORDER BY day_of_week, start_time",
                )?
                .query_map([&host_id], |row| {
                    Ok(Window {
                        host_id: row.get(0)?,
                        day_of_week: row.get(1)?,
                        start_time: row.get(2)?,
                        end_time: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?;
    Ok(windows)
}

pub async fn list_blocks(db: &Connection, host_id: &str) -> Result<Vec<Block>> {
    let host_id = host_id.to_string();
    let blocks = db
        .call(move |conn| {
            let rows = conn
                .prepare(
                    r"SELECT id, host_id, start_time, end_time
                      FROM blocks
                      WHERE host_id = ?
                      ORDER BY start_time",
                )?
                .query_map([&host_id], |row| {
                    Ok(Block {
                        id: row.get(0)?,
                        host_id: row.get(1)?,
                        start_time: row.get(2)?,
                        end_time: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?;
    Ok(blocks)
}

pub async fn insert_window(db: &Connection, window: Window) -> Result<()> {
    db.call(move |conn| {
        conn.execute(
            r"INSERT INTO availability_windows (host_id, day_of_week, start_time, end_time)
              VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                window.host_id,
                window.day_of_week,
                window.start_time,
                window.end_time
            ],
        )?;
        Ok(())
    })
    .await?;
    Ok(())
}

pub async fn insert_block(db: &Connection, block: Block) -> Result<()> {
    db.call(move |conn| {
        conn.execute(
            "INSERT INTO blocks (id, host_id, start_time, end_time) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![block.id, block.host_id, block.start_time, block.end_time],
        )?;
        Ok(())
    })
    .await?;
    Ok(())
}

pub async fn delete_block(db: &Connection, id: &str) -> Result<bool> {
    let id = id.to_string();
    let deleted = db
        .call(move |conn| {
            let count = conn.execute("DELETE FROM blocks WHERE id = ?", rusqlite::params![id])?;
            Ok(count > 0)
        })
        .await?;
    Ok(deleted)
}
