//! Test utilities for integration tests
use std::env;
use std::fs;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use axum::{Router, body::Body};

use slotbook::api::AppState;
use slotbook::api::app;
use slotbook::core::AppConfig;
use slotbook::core::db::async_db;
use slotbook::core::db::initialize_db;
use slotbook::google::GoogleCalendar;

/// A Monday far enough in the future that minimum-notice cutoffs
/// never reach it.
pub const TEST_DATE: &str = "2099-06-01";

/// Creates a test application router with a temporary database
/// seeded with two hosts, a solo event type, and a round robin event
/// type, each with a 09:00-17:00 UTC window on Mondays.
pub async fn test_app() -> Router {
    // Create a unique directory for the test with a randomly
    // generated name using a timestamp to avoid collisions and
    // vulnerabilities
    let temp_dir = env::temp_dir();
    let ts = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_nanos()
        .to_string();
    let dir = temp_dir.join(ts);
    fs::create_dir_all(&dir).expect("Failed to create base directory");

    let db_path = dir.join("db");
    fs::create_dir_all(&db_path).expect("Failed to create db directory");
    let db_path_str = db_path.to_str().unwrap();

    let db = async_db(db_path_str)
        .await
        .expect("Failed to connect to async db");
    db.call(|conn| {
        initialize_db(conn).expect("Failed to migrate db");
        Ok(())
    })
    .await
    .unwrap();

    seed_fixture(&db).await;

    let app_config = AppConfig {
        db_path: db_path_str.to_string(),
        app_origin: String::from("http://localhost:2222"),
        google_client_id: String::from("test_client_id"),
        google_client_secret: String::from("test_client_secret"),
        google_api_hostname: String::from("http://localhost:9"),
        google_oauth_hostname: String::from("http://localhost:9"),
        // Empty key disables outbound email in tests
        email_api_key: String::from(""),
        email_api_hostname: String::from("http://localhost:9"),
        email_from: String::from("Test <test@example.com>"),
    };

    // No calendar_auth rows exist so the provider never makes a
    // network request.
    let calendar = Arc::new(GoogleCalendar::new(db.clone(), &app_config));
    let app_state = AppState::new(db, app_config, calendar);
    app(Arc::new(RwLock::new(app_state)))
}

async fn seed_fixture(db: &tokio_rusqlite::Connection) {
    db.call(|conn| {
        conn.execute_batch(
            r"
            INSERT INTO hosts (id, email) VALUES
              ('host-a', 'host-a@example.com'),
              ('host-b', 'host-b@example.com');

            INSERT INTO event_types
              (id, name, owner_host_id, duration_minutes, buffer_before,
               buffer_after, min_notice_minutes, scheduling_mode, team_id)
            VALUES
              ('et-solo', 'Intro Call', 'host-a', 30, 0, 0, 0, 'solo', NULL),
              ('et-rr', 'Team Call', 'host-a', 30, 0, 0, 0, 'round_robin', 'team-1');

            INSERT INTO event_type_hosts (event_type_id, host_id) VALUES
              ('et-rr', 'host-a'),
              ('et-rr', 'host-b');

            -- Mondays, 09:00-17:00 UTC
            INSERT INTO availability_windows (host_id, day_of_week, start_time, end_time)
            VALUES
              ('host-a', 1, '09:00', '17:00'),
              ('host-b', 1, '09:00', '17:00');
            ",
        )?;
        Ok(())
    })
    .await
    .expect("Failed to seed fixture data");
}

/// Collect a response body into a string.
pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read response body");
    String::from_utf8(bytes.to_vec()).expect("Response body was not utf-8")
}
