use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityStatus {
    Available,
    Booked,
    Blocked,
}

impl AvailabilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::Available => "available",
            AvailabilityStatus::Booked => "booked",
            AvailabilityStatus::Blocked => "blocked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(AvailabilityStatus::Available),
            "booked" => Some(AvailabilityStatus::Booked),
            "blocked" => Some(AvailabilityStatus::Blocked),
            _ => None,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, AvailabilityStatus::Available)
    }
}

/// Explicit calendar record for one room on one date. Dates without a
/// record are available at the room's base price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityDay {
    pub room_id: i64,
    pub date: NaiveDate,
    pub status: AvailabilityStatus,
    pub price_override: Option<i64>,
    pub booking_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetOverrideRequest {
    pub date: NaiveDate,
    pub status: AvailabilityStatus,
    pub price: Option<i64>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkAvailabilityRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: AvailabilityStatus,
    pub price: Option<i64>,
    #[serde(default)]
    pub exclude_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub force: bool,
}

/// Iterates `[start, end)` one day at a time.
pub fn nights(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d < end)
}
