use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Upper bound for a nightly or per-person price, in VND.
pub const MAX_PRICE: i64 = 1_000_000_000_000;
pub const MAX_CAPACITY: i64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub homestay_id: i64,
    pub name: String,
    pub description: String,
    pub room_type: String,
    pub capacity: i64,
    pub price: i64,
    pub price_type: PriceType,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    PerNight,
    PerPerson,
}

impl PriceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceType::PerNight => "per_night",
            PriceType::PerPerson => "per_person",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "per_night" => Some(PriceType::PerNight),
            "per_person" => Some(PriceType::PerPerson),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoomRequest {
    pub homestay_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_room_type")]
    pub room_type: String,
    pub capacity: i64,
    pub price: i64,
    pub price_type: PriceType,
}

fn default_room_type() -> String {
    "standard".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRoomRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub room_type: Option<String>,
    pub capacity: Option<i64>,
    pub price: Option<i64>,
    pub price_type: Option<PriceType>,
    pub is_active: Option<bool>,
}

impl UpdateRoomRequest {
    /// Fields that change what an existing booking was priced against.
    pub fn touches_pricing(&self) -> bool {
        self.capacity.is_some() || self.price.is_some() || self.price_type.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomFilter {
    pub homestay_id: Option<i64>,
    pub name: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_capacity: Option<i64>,
    pub is_active: Option<bool>,
}

/// Room figures for one homestay on a given date. Inactive rooms count as
/// under maintenance and are left out of occupancy.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RoomStats {
    pub date: NaiveDate,
    pub total_rooms: i64,
    pub available_rooms: i64,
    pub occupied_rooms: i64,
    pub maintenance_rooms: i64,
    pub average_price: f64,
    pub total_revenue: i64,
    pub occupancy_rate: f64,
}

impl RoomStats {
    pub fn active_rooms(&self) -> i64 {
        self.total_rooms - self.maintenance_rooms
    }
}
