use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Host,
    Guest,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Host => "host",
            Role::Guest => "guest",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "host" => Some(Role::Host),
            "guest" => Some(Role::Guest),
            _ => None,
        }
    }
}

/// Things an actor may attempt. Ownership is checked separately for the
/// capabilities that act on a specific homestay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ManageProperty,
    ManageCalendar,
    ViewAllBookings,
    AdvanceBookingStatus,
    CancelOwnBooking,
    CreateBooking,
    WriteReview,
}

impl Role {
    pub fn can(&self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            Role::Admin => true,
            Role::Host => matches!(
                capability,
                ManageProperty
                    | ManageCalendar
                    | ViewAllBookings
                    | AdvanceBookingStatus
                    | CreateBooking
            ),
            Role::Guest => matches!(capability, CancelOwnBooking | CreateBooking | WriteReview),
        }
    }
}

/// Authenticated identity handed over by the upstream gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
}
