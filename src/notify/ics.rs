//! Minimal iCalendar invite generation for booking emails
use chrono::{DateTime, Utc};
use uuid::Uuid;

fn ics_instant(instant: DateTime<Utc>) -> String {
    instant.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Escape text per RFC 5545: backslash, comma, semicolon, newline.
fn ics_escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace(';', "\\;")
        .replace('\n', "\\n")
}

/// Render a single-event VCALENDAR suitable as an email attachment.
pub fn generate_ics(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    summary: &str,
    description: &str,
    attendee_email: &str,
    attendee_name: Option<&str>,
) -> String {
    let uid = Uuid::new_v4();
    let attendee_cn = attendee_name.unwrap_or(attendee_email);

    let lines = [
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//slotbook//booking//EN".to_string(),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:REQUEST".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}@slotbook", uid),
        format!("DTSTAMP:{}", ics_instant(Utc::now())),
        format!("DTSTART:{}", ics_instant(start)),
        format!("DTEND:{}", ics_instant(end)),
        format!("SUMMARY:{}", ics_escape(summary)),
        format!("DESCRIPTION:{}", ics_escape(description)),
        format!(
            "ATTENDEE;CN={};RSVP=TRUE:mailto:{}",
            ics_escape(attendee_cn),
            attendee_email
        ),
        "END:VEVENT".to_string(),
        "END:VCALENDAR".to_string(),
    ];

    lines.join("\r\n")
}
