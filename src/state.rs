use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::booking::BookingWorkflow;
use crate::services::ledger::AvailabilityLedger;
use crate::services::status::StatusGuard;

/// Built once at startup and shared by every request.
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub ledger: Arc<AvailabilityLedger>,
    pub bookings: BookingWorkflow,
    pub status_guard: StatusGuard,
}

impl AppState {
    pub fn new(conn: Connection, config: AppConfig) -> Self {
        let db = Arc::new(Mutex::new(conn));
        let ledger = Arc::new(AvailabilityLedger::new(
            Arc::clone(&db),
            config.max_calendar_days,
        ));

        Self {
            bookings: BookingWorkflow::new(Arc::clone(&db), Arc::clone(&ledger)),
            status_guard: StatusGuard::new(Arc::clone(&db)),
            ledger,
            db,
            config,
        }
    }
}
