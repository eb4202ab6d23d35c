//! Database connection setup and schema initialization
use anyhow::Result;
use rusqlite::Connection;

/// Connect to the SQLite database at the given path using the async
/// wrapper. The database file is created on first use.
pub async fn async_db(db_path: &str) -> Result<tokio_rusqlite::Connection> {
    let path = format!("{}/slotbook.sqlite3", db_path);
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Ok(conn)
}

/// Create the schema if it doesn't already exist. Safe to run
/// repeatedly.
pub fn initialize_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS hosts (
          id TEXT PRIMARY KEY,
          email TEXT NOT NULL,
          include_all_day_blocks INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS event_types (
          id TEXT PRIMARY KEY,
          name TEXT NOT NULL,
          owner_host_id TEXT,
          duration_minutes INTEGER NOT NULL,
          buffer_before INTEGER NOT NULL DEFAULT 0,
          buffer_after INTEGER NOT NULL DEFAULT 0,
          min_notice_minutes INTEGER NOT NULL DEFAULT 60,
          scheduling_mode TEXT NOT NULL DEFAULT 'solo',
          team_id TEXT
        );

        CREATE TABLE IF NOT EXISTS event_type_hosts (
          event_type_id TEXT NOT NULL,
          host_id TEXT NOT NULL,
          PRIMARY KEY (event_type_id, host_id)
        );

        CREATE TABLE IF NOT EXISTS availability_windows (
          host_id TEXT NOT NULL,
          day_of_week INTEGER NOT NULL,
          start_time TEXT NOT NULL,
          end_time TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS blocks (
          id TEXT PRIMARY KEY,
          host_id TEXT NOT NULL,
          start_time TEXT NOT NULL,
          end_time TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS bookings (
          id TEXT PRIMARY KEY,
          host_id TEXT NOT NULL,
          event_type_id TEXT NOT NULL,
          invitee_email TEXT NOT NULL,
          invitee_name TEXT,
          notes TEXT,
          start_time TEXT NOT NULL,
          end_time TEXT NOT NULL,
          manage_token TEXT NOT NULL UNIQUE,
          external_event_id TEXT,
          status TEXT NOT NULL DEFAULT 'confirmed'
        );

        CREATE INDEX IF NOT EXISTS idx_bookings_host_time
          ON bookings (host_id, start_time, end_time);

        CREATE TABLE IF NOT EXISTS calendar_auth (
          host_id TEXT PRIMARY KEY,
          refresh_token TEXT NOT NULL,
          access_token TEXT,
          expires_at TEXT
        );
        ",
    )?;
    Ok(())
}
