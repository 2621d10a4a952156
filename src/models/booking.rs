use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::{Payment, PriceType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub user_id: Option<i64>,
    pub homestay_id: i64,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub num_guests: i64,
    pub total_amount: i64,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub rooms: Vec<BookingRoom>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

/// One reserved room inside a booking. Shares the parent's date range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingRoom {
    pub room_id: i64,
    pub capacity: i64,
    pub price: i64,
    pub price_type: PriceType,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::CheckedIn => "checked_in",
            BookingStatus::CheckedOut => "checked_out",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "checked_in" => Some(BookingStatus::CheckedIn),
            "checked_out" => Some(BookingStatus::CheckedOut),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::CheckedOut | BookingStatus::Cancelled)
    }

    /// Forward-only lifecycle; cancellation only before check-in.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, CheckedIn)
                | (CheckedIn, CheckedOut)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuestInfo {
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomRequest {
    pub room_id: i64,
    pub capacity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub guest: GuestInfo,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub num_guests: i64,
    #[serde(default)]
    pub notes: Option<String>,
    pub rooms: Vec<RoomRequest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub customer_name: Option<String>,
    pub room_id: Option<i64>,
    pub homestay_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingDetail {
    pub booking: Booking,
    pub payments: Vec<Payment>,
    pub paid_amount: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip_strings() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::CheckedIn,
            BookingStatus::CheckedOut,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("approved"), None);
    }

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Confirmed));
        assert!(BookingStatus::Confirmed.can_transition_to(BookingStatus::CheckedIn));
        assert!(BookingStatus::CheckedIn.can_transition_to(BookingStatus::CheckedOut));
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Cancelled));
        assert!(BookingStatus::Confirmed.can_transition_to(BookingStatus::Cancelled));
    }

    #[test]
    fn test_backward_and_terminal_transitions_rejected() {
        assert!(!BookingStatus::CheckedOut.can_transition_to(BookingStatus::Confirmed));
        assert!(!BookingStatus::CheckedIn.can_transition_to(BookingStatus::Cancelled));
        assert!(!BookingStatus::Cancelled.can_transition_to(BookingStatus::Confirmed));
        assert!(!BookingStatus::Confirmed.can_transition_to(BookingStatus::Confirmed));
        assert!(!BookingStatus::Pending.can_transition_to(BookingStatus::CheckedIn));
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(BookingStatus::CheckedOut.is_terminal());
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&BookingStatus::CheckedIn).unwrap();
        assert_eq!(json, "\"checked_in\"");
        let parsed: BookingStatus = serde_json::from_str("\"checked_out\"").unwrap();
        assert_eq!(parsed, BookingStatus::CheckedOut);
    }
}
