use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Homestay {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: String,
    pub address: String,
    pub city: String,
    pub district: String,
    pub ward: String,
    pub latitude: f64,
    pub longitude: f64,
    pub status: HomestayStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HomestayStatus {
    Active,
    Inactive,
    Pending,
}

impl HomestayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HomestayStatus::Active => "active",
            HomestayStatus::Inactive => "inactive",
            HomestayStatus::Pending => "pending",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(HomestayStatus::Active),
            "inactive" => Some(HomestayStatus::Inactive),
            "pending" => Some(HomestayStatus::Pending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateHomestayRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub address: String,
    pub city: String,
    pub district: String,
    pub ward: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateHomestayRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub ward: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: Option<HomestayStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HomestayFilter {
    pub name: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub status: Option<HomestayStatus>,
    pub owner_id: Option<i64>,
}

/// Totals across a set of homestays. Bookings and revenue exclude
/// cancelled bookings.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct HomestayStats {
    pub total_homestays: i64,
    pub active_homestays: i64,
    pub total_rooms: i64,
    pub available_rooms: i64,
    pub total_bookings: i64,
    pub total_revenue: i64,
}
