//! Database queries for the bookings API
use anyhow::Result;
use tokio_rusqlite::Connection;

use super::public::Booking;

const BOOKING_COLUMNS: &str = r"
  id,
  host_id,
  event_type_id,
  invitee_email,
  invitee_name,
  notes,
  start_time,
  end_time,
  manage_token,
  external_event_id,
  status
";

fn booking_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        host_id: row.get(1)?,
        event_type_id: row.get(2)?,
        invitee_email: row.get(3)?,
        invitee_name: row.get(4)?,
        notes: row.get(5)?,
        start_time: row.get(6)?,
        end_time: row.get(7)?,
        manage_token: row.get(8)?,
        external_event_id: row.get(9)?,
        status: row.get(10)?,
    })
}

async fn booking_by(db: &Connection, column: &'static str, value: String) -> Result<Option<Booking>> {
    let booking = db
        .call(move |conn| {
            let sql = format!(
                "SELECT {} FROM bookings WHERE {} = ? LIMIT 1",
                BOOKING_COLUMNS, column
            );
            let result = conn
                .prepare(&sql)?
                .query_row([&value], booking_from_row)
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            Ok(result)
        })
        .await?;
    Ok(booking)
}

pub async fn get_booking_by_id(db: &Connection, id: &str) -> Result<Option<Booking>> {
    booking_by(db, "id", id.to_string()).await
}

pub async fn get_booking_by_token(db: &Connection, token: &str) -> Result<Option<Booking>> {
    booking_by(db, "manage_token", token.to_string()).await
}

pub async fn list_bookings(db: &Connection) -> Result<Vec<Booking>> {
    let bookings = db
        .call(|conn| {
            let sql = format!(
                "SELECT {} FROM bookings ORDER BY start_time",
                BOOKING_COLUMNS
            );
            let rows = conn
                .prepare(&sql)?
                .query_map([], booking_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?;
    Ok(bookings)
}

pub async fn insert_booking(db: &Connection, booking: Booking) -> Result<()> {
    db.call(move |conn| {
        conn.execute(
            r"INSERT INTO bookings
              (id, host_id, event_type_id, invitee_email, invitee_name, notes,
               start_time, end_time, manage_token, external_event_id, status)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                booking.id,
                booking.host_id,
                booking.event_type_id,
                booking.invitee_email,
                booking.invitee_name,
                booking.notes,
                booking.start_time,
                booking.end_time,
                booking.manage_token,
                booking.external_event_id,
                booking.status,
            ],
        )?;
        Ok(())
    })
    .await?;
    Ok(())
}

pub async fn update_booking_times(
    db: &Connection,
    id: &str,
    host_id: &str,
    start_time: &str,
    end_time: &str,
) -> Result<()> {
    let (id, host_id, start_time, end_time) = (
        id.to_string(),
        host_id.to_string(),
        start_time.to_string(),
        end_time.to_string(),
    );
    db.call(move |conn| {
        conn.execute(
            "UPDATE bookings SET host_id = ?1, start_time = ?2, end_time = ?3 WHERE id = ?4",
            rusqlite::params![host_id, start_time, end_time, id],
        )?;
        Ok(())
    })
    .await?;
    Ok(())
}

pub async fn set_external_event_id(
    db: &Connection,
    id: &str,
    external_event_id: Option<String>,
) -> Result<()> {
    let id = id.to_string();
    db.call(move |conn| {
        conn.execute(
            "UPDATE bookings SET external_event_id = ?1 WHERE id = ?2",
            rusqlite::params![external_event_id, id],
        )?;
        Ok(())
    })
    .await?;
    Ok(())
}

/// Cancel keeps the row so the manage link can explain what happened;
/// every busy/conflict/load query excludes cancelled rows.
pub async fn cancel_booking(db: &Connection, id: &str) -> Result<()> {
    let id = id.to_string();
    db.call(move |conn| {
        conn.execute(
            "UPDATE bookings SET status = 'cancelled' WHERE id = ?",
            rusqlite::params![id],
        )?;
        Ok(())
    })
    .await?;
    Ok(())
}

pub async fn get_host_email(db: &Connection, host_id: &str) -> Result<Option<String>> {
    let host_id = host_id.to_string();
    let email = db
        .call(move |conn| {
            let email = conn
                .prepare("SELECT email FROM hosts WHERE id = ?")?
                .query_row([&host_id], |row| row.get::<_, String>(0))
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            Ok(email)
        })
        .await?;
    Ok(email)
}
