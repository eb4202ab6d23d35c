//! Google Calendar collaborator
//!
//! The slot generator and booking flow only ever talk to the
//! [`CalendarProvider`] trait so tests can substitute canned busy
//! intervals. The production implementation resolves access tokens
//! from the `calendar_auth` table (refreshing through OAuth when
//! close to expiry) and calls the Calendar v3 REST API.
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio_rusqlite::Connection;

use crate::core::AppConfig;
use crate::google::oauth::refresh_access_token;
use crate::scheduling::Interval;

/// Well-known id suffix of Google's regional holiday calendars.
const HOLIDAY_CALENDAR_ID: &str = "holiday@group.v.calendar.google.com";

/// Details for an event written through to the host's calendar.
#[derive(Debug, Clone)]
pub struct EventWrite {
    pub summary: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendee_email: String,
    pub attendee_name: Option<String>,
}

/// External calendar busy-time source plus best-effort event
/// write-through. Write methods default to no-ops so read-only
/// providers (test stubs) only implement `busy_intervals`.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Busy intervals for one host over the given range, including
    /// holiday calendars. `include_all_day` controls whether all-day
    /// entries count as busy for this host.
    async fn busy_intervals(
        &self,
        host_id: &str,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        include_all_day: bool,
    ) -> Result<Vec<Interval>>;

    /// Create an event on the host's calendar and return its id, or
    /// `None` when the host has no connected calendar.
    async fn insert_event(&self, _host_id: &str, _event: EventWrite) -> Result<Option<String>> {
        Ok(None)
    }

    async fn update_event(
        &self,
        _host_id: &str,
        _event_id: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<()> {
        Ok(())
    }

    async fn delete_event(&self, _host_id: &str, _event_id: &str) -> Result<()> {
        Ok(())
    }
}

// Calendar v3 response shapes, reduced to the fields we read

#[derive(Debug, Deserialize)]
struct EventTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleEvent {
    id: Option<String>,
    start: Option<EventTime>,
    end: Option<EventTime>,
}

#[derive(Debug, Deserialize)]
struct EventsListResponse {
    items: Option<Vec<GoogleEvent>>,
}

#[derive(Debug, Deserialize)]
struct CalendarListEntry {
    id: Option<String>,
    summary: Option<String>,
    #[serde(rename = "summaryOverride")]
    summary_override: Option<String>,
    deleted: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CalendarListResponse {
    items: Option<Vec<CalendarListEntry>>,
}

impl EventTime {
    /// Resolve to an instant. All-day entries carry a date only and
    /// resolve to midnight UTC.
    fn instant(&self) -> Option<DateTime<Utc>> {
        if let Some(date_time) = &self.date_time {
            return DateTime::parse_from_rfc3339(date_time)
                .ok()
                .map(|dt| dt.with_timezone(&Utc));
        }
        let date = self.date.as_ref()?;
        DateTime::parse_from_rfc3339(&format!("{}T00:00:00Z", date))
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn is_all_day(&self) -> bool {
        self.date.is_some() && self.date_time.is_none()
    }
}

pub struct GoogleCalendar {
    db: Connection,
    http: Client,
    api_hostname: String,
    oauth_hostname: String,
    client_id: String,
    client_secret: String,
}

impl GoogleCalendar {
    pub fn new(db: Connection, config: &AppConfig) -> Self {
        Self {
            db,
            http: Client::new(),
            api_hostname: config.google_api_hostname.clone(),
            oauth_hostname: config.google_oauth_hostname.clone(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
        }
    }

    /// Resolve a usable access token for the host, refreshing when the
    /// stored one is within 60 seconds of expiry. `None` means the
    /// host never connected a calendar.
    async fn access_token(&self, host_id: &str) -> Result<Option<String>> {
        let host = host_id.to_string();
        let row: Option<(String, Option<String>, Option<String>)> = self
            .db
            .call(move |conn| {
                let row = conn
                    .prepare(
                        r"SELECT refresh_token, access_token, expires_at
                          FROM calendar_auth WHERE host_id = ?",
                    )?
                    .query_row([&host], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                    })
                    .map(Some)
                    .or_else(|e| match e {
                        rusqlite::Error::QueryReturnedNoRows => Ok(None),
                        other => Err(other),
                    })?;
                Ok(row)
            })
            .await?;

        let Some((refresh_token, access_token, expires_at)) = row else {
            return Ok(None);
        };

        let now = Utc::now();
        if let (Some(token), Some(expires_at)) = (&access_token, &expires_at) {
            if let Ok(expiry) = DateTime::parse_from_rfc3339(expires_at) {
                if expiry.with_timezone(&Utc) - now > Duration::seconds(60) {
                    return Ok(Some(token.clone()));
                }
            }
        }

        match refresh_access_token(
            &self.http,
            &self.oauth_hostname,
            &self.client_id,
            &self.client_secret,
            &refresh_token,
        )
        .await
        {
            Ok(tokens) => {
                let new_token = tokens.access_token.clone();
                let expiry = (now + Duration::seconds(tokens.expires_in))
                    .to_rfc3339_opts(SecondsFormat::Secs, true);
                let host = host_id.to_string();
                self.db
                    .call(move |conn| {
                        conn.execute(
                            r"UPDATE calendar_auth
                              SET access_token = ?1, expires_at = ?2
                              WHERE host_id = ?3",
                            rusqlite::params![tokens.access_token, expiry, host],
                        )?;
                        Ok(())
                    })
                    .await?;
                Ok(Some(new_token))
            }
            Err(err) => {
                // Best effort: a stale token may still be accepted
                tracing::warn!("Google token refresh failed for host {}: {}", host_id, err);
                Ok(access_token)
            }
        }
    }

    async fn list_busy(
        &self,
        access_token: &str,
        calendar_id: &str,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        include_all_day: bool,
        max_results: u32,
    ) -> Result<Vec<Interval>> {
        let url = format!(
            "{}/calendar/v3/calendars/{}/events",
            self.api_hostname,
            urlencoding::encode(calendar_id)
        );
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", range_start.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("timeMax", range_end.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", max_results.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(anyhow!(
                "Calendar events list failed for {} ({})",
                calendar_id,
                status
            ));
        }

        let events = response.json::<EventsListResponse>().await?;
        let intervals = events
            .items
            .unwrap_or_default()
            .into_iter()
            .filter_map(|event| {
                let start = event.start?;
                let end = event.end?;
                if start.is_all_day() && !include_all_day {
                    return None;
                }
                Some(Interval::new(start.instant()?, end.instant()?))
            })
            .collect();
        Ok(intervals)
    }

    async fn holiday_calendar_ids(&self, access_token: &str) -> Result<Vec<String>> {
        let response = self
            .http
            .get(format!("{}/calendar/v3/users/me/calendarList", self.api_hostname))
            .bearer_auth(access_token)
            .query(&[("maxResults", "50")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(anyhow!("Calendar list failed ({})", status));
        }

        let list = response.json::<CalendarListResponse>().await?;
        let ids = list
            .items
            .unwrap_or_default()
            .into_iter()
            .filter(|entry| !entry.deleted.unwrap_or(false))
            .filter(|entry| {
                if let Some(id) = &entry.id {
                    if id.contains(HOLIDAY_CALENDAR_ID) {
                        return true;
                    }
                }
                let name = entry
                    .summary_override
                    .as_deref()
                    .or(entry.summary.as_deref())
                    .unwrap_or("");
                name.to_lowercase().contains("holiday")
            })
            .filter_map(|entry| entry.id)
            .collect();
        Ok(ids)
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendar {
    async fn busy_intervals(
        &self,
        host_id: &str,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        include_all_day: bool,
    ) -> Result<Vec<Interval>> {
        let Some(token) = self.access_token(host_id).await? else {
            // No connected calendar means no external busy data
            return Ok(Vec::new());
        };

        let mut intervals = self
            .list_busy(&token, "primary", range_start, range_end, include_all_day, 2500)
            .await?;

        // Holiday calendars block availability too, but a failure to
        // enumerate them shouldn't lose the primary calendar's data.
        match self.holiday_calendar_ids(&token).await {
            Ok(calendar_ids) => {
                for calendar_id in calendar_ids {
                    match self
                        .list_busy(&token, &calendar_id, range_start, range_end, true, 100)
                        .await
                    {
                        Ok(holiday) => intervals.extend(holiday),
                        Err(err) => {
                            tracing::warn!(
                                "Failed to load holiday calendar {}: {}",
                                calendar_id,
                                err
                            );
                        }
                    }
                }
            }
            Err(err) => {
                tracing::warn!("Failed to list holiday calendars: {}", err);
            }
        }

        Ok(intervals)
    }

    async fn insert_event(&self, host_id: &str, event: EventWrite) -> Result<Option<String>> {
        let Some(token) = self.access_token(host_id).await? else {
            return Ok(None);
        };

        let mut attendee = json!({ "email": event.attendee_email });
        if let Some(name) = &event.attendee_name {
            attendee["displayName"] = json!(name);
        }

        let response = self
            .http
            .post(format!(
                "{}/calendar/v3/calendars/primary/events",
                self.api_hostname
            ))
            .bearer_auth(&token)
            .query(&[("sendUpdates", "all")])
            .json(&json!({
                "summary": event.summary,
                "description": event.description,
                "start": { "dateTime": event.start.to_rfc3339_opts(SecondsFormat::Secs, true) },
                "end": { "dateTime": event.end.to_rfc3339_opts(SecondsFormat::Secs, true) },
                "attendees": [attendee],
                "guestsCanSeeOtherGuests": true,
                "guestsCanInviteOthers": false,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(anyhow!("Calendar event insert failed ({})", status));
        }

        let created = response.json::<GoogleEvent>().await?;
        Ok(created.id)
    }

    async fn update_event(
        &self,
        host_id: &str,
        event_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<()> {
        let Some(token) = self.access_token(host_id).await? else {
            return Ok(());
        };

        let response = self
            .http
            .patch(format!(
                "{}/calendar/v3/calendars/primary/events/{}",
                self.api_hostname,
                urlencoding::encode(event_id)
            ))
            .bearer_auth(&token)
            .query(&[("sendUpdates", "all")])
            .json(&json!({
                "start": { "dateTime": start.to_rfc3339_opts(SecondsFormat::Secs, true) },
                "end": { "dateTime": end.to_rfc3339_opts(SecondsFormat::Secs, true) },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(anyhow!("Calendar event update failed ({})", status));
        }
        Ok(())
    }

    async fn delete_event(&self, host_id: &str, event_id: &str) -> Result<()> {
        let Some(token) = self.access_token(host_id).await? else {
            return Ok(());
        };

        let response = self
            .http
            .delete(format!(
                "{}/calendar/v3/calendars/primary/events/{}",
                self.api_hostname,
                urlencoding::encode(event_id)
            ))
            .bearer_auth(&token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(anyhow!("Calendar event delete failed ({})", status));
        }
        Ok(())
    }
}
