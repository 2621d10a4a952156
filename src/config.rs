use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    /// Longest stay or calendar edit accepted in one request, in days.
    pub max_calendar_days: i64,
    /// `*` allows any origin.
    pub cors_allow_origin: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "homestay.db".to_string()),
            max_calendar_days: env::var("MAX_CALENDAR_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|days: &i64| *days > 0)
                .unwrap_or(366),
            cors_allow_origin: env::var("CORS_ALLOW_ORIGIN").unwrap_or_else(|_| "*".to_string()),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: ":memory:".to_string(),
            max_calendar_days: 366,
            cors_allow_origin: "*".to_string(),
        }
    }
}
