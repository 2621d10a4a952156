use rusqlite::Connection;

use crate::db::{queries, required};
use crate::errors::{AppError, AppResult};
use crate::models::{Actor, BookingStatus, CreatePaymentRequest, Payment};
use crate::services::access;

/// Records a payment against a booking the actor can see. Cancelled
/// bookings take no further payments.
pub fn create_payment(
    conn: &Connection,
    actor: &Actor,
    booking_id: &str,
    req: &CreatePaymentRequest,
) -> AppResult<Payment> {
    if req.amount <= 0 {
        return Err(AppError::validation("amount must be positive"));
    }
    if req.payment_method.trim().is_empty() {
        return Err(AppError::validation("payment_method is required"));
    }

    let booking = required(queries::bookings::get_booking(conn, booking_id)?, || {
        format!("booking {booking_id}")
    })?;
    access::ensure_booking_visible(conn, actor, &booking)?;
    if booking.status == BookingStatus::Cancelled {
        return Err(AppError::conflict(format!(
            "booking {booking_id} is cancelled"
        )));
    }

    let payment = queries::payments::create_payment(conn, booking_id, req)?;
    tracing::info!(
        booking_id,
        payment_id = payment.id,
        amount = payment.amount,
        status = payment.payment_status.as_str(),
        "payment recorded"
    );
    Ok(payment)
}
