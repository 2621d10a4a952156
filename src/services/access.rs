use rusqlite::Connection;

use crate::db::{queries, required};
use crate::errors::{AppError, AppResult};
use crate::models::{Actor, Booking, Capability, Homestay, Role};

pub fn require(actor: &Actor, capability: Capability) -> AppResult<()> {
    if actor.role.can(capability) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(format!(
            "role '{}' may not {capability:?}",
            actor.role.as_str()
        )))
    }
}

/// Admins pass; everyone else must be the owner.
pub fn ensure_owner(actor: &Actor, owner_id: i64) -> AppResult<()> {
    if actor.role == Role::Admin || actor.user_id == owner_id {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(
            "actor does not own this homestay".to_string(),
        ))
    }
}

/// Loads a homestay the actor may act on with `capability`.
pub fn owned_homestay(
    conn: &Connection,
    actor: &Actor,
    homestay_id: i64,
    capability: Capability,
) -> AppResult<Homestay> {
    require(actor, capability)?;
    let homestay = required(queries::homestays::get_homestay(conn, homestay_id)?, || {
        format!("homestay {homestay_id}")
    })?;
    ensure_owner(actor, homestay.owner_id)?;
    Ok(homestay)
}

/// Admins see every booking, hosts the bookings of homestays they own,
/// guests only their own.
pub fn ensure_booking_visible(conn: &Connection, actor: &Actor, booking: &Booking) -> AppResult<()> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Host => {
            let homestay = required(queries::homestays::get_homestay(conn, booking.homestay_id)?, || {
                format!("homestay {}", booking.homestay_id)
            })?;
            ensure_owner(actor, homestay.owner_id)
        }
        Role::Guest if booking.user_id == Some(actor.user_id) => Ok(()),
        Role::Guest => Err(AppError::PermissionDenied(
            "booking belongs to another guest".to_string(),
        )),
    }
}
