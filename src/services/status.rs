use std::sync::{Arc, Mutex};

use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;

use crate::db::{self, queries, required};
use crate::errors::{AppError, AppResult};
use crate::models::{Actor, Booking, BookingStatus, Capability, Role};
use crate::services::{access, ledger};

#[derive(Debug, Serialize)]
pub struct StatusUpdate {
    pub success: bool,
}

/// Owns every write to a booking after creation: status only.
pub struct StatusGuard {
    db: Arc<Mutex<Connection>>,
}

impl StatusGuard {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    /// Moves a booking along its lifecycle. Illegal transitions are rejected
    /// before anything is written; cancelling releases every room's nights in
    /// the same transaction as the status change.
    pub fn update_booking_status(
        &self,
        actor: &Actor,
        booking_id: &str,
        next: BookingStatus,
    ) -> AppResult<StatusUpdate> {
        let mut conn = db::lock(&self.db)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let booking = required(queries::bookings::get_booking(&tx, booking_id)?, || {
            format!("booking {booking_id}")
        })?;
        authorize(&tx, actor, &booking, next)?;

        let current = booking.status;
        if !current.can_transition_to(next) {
            return Err(AppError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        if !queries::bookings::update_status_if(&tx, booking_id, current, next)? {
            return Err(AppError::conflict(format!(
                "booking {booking_id} changed status concurrently"
            )));
        }

        if next == BookingStatus::Cancelled {
            for line in &booking.rooms {
                ledger::release_in(&tx, line.room_id, booking.check_in, booking.check_out, booking_id)?;
            }
        }
        tx.commit()?;

        tracing::info!(booking_id, from = %current, to = %next, "booking status updated");
        Ok(StatusUpdate { success: true })
    }
}

fn authorize(conn: &Connection, actor: &Actor, booking: &Booking, next: BookingStatus) -> AppResult<()> {
    let own_cancel = next == BookingStatus::Cancelled
        && actor.role.can(Capability::CancelOwnBooking)
        && booking.user_id == Some(actor.user_id);
    if own_cancel {
        return Ok(());
    }

    access::require(actor, Capability::AdvanceBookingStatus)?;
    if actor.role == Role::Host {
        access::ensure_booking_visible(conn, actor, booking)?;
    }
    Ok(())
}
