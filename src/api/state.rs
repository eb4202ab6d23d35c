use std::sync::Arc;

use tokio_rusqlite::Connection;

use crate::core::AppConfig;
use crate::google::CalendarProvider;
use crate::notify::Mailer;
use crate::scheduling::AvailableDaysCache;

pub struct AppState {
    pub db: Connection,
    pub config: AppConfig,
    pub calendar: Arc<dyn CalendarProvider>,
    pub mailer: Arc<Mailer>,
    pub days_cache: Arc<AvailableDaysCache>,
}

impl AppState {
    pub fn new(db: Connection, config: AppConfig, calendar: Arc<dyn CalendarProvider>) -> Self {
        let mailer = Arc::new(Mailer::new(&config));
        Self {
            db,
            config,
            calendar,
            mailer,
            days_cache: Arc::new(AvailableDaysCache::with_default_ttl()),
        }
    }
}
