use rusqlite::{params, Connection};

use crate::db::{now_timestamp, parse_timestamp};
use crate::models::{CreatePaymentRequest, Payment, PaymentStatus};

pub fn create_payment(
    conn: &Connection,
    booking_id: &str,
    req: &CreatePaymentRequest,
) -> anyhow::Result<Payment> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO payments (booking_id, amount, payment_method, payment_status, transaction_id, payment_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            booking_id,
            req.amount,
            req.payment_method,
            req.payment_status.as_str(),
            req.transaction_id,
            now,
        ],
    )?;

    Ok(Payment {
        id: conn.last_insert_rowid(),
        booking_id: booking_id.to_string(),
        amount: req.amount,
        payment_method: req.payment_method.clone(),
        payment_status: req.payment_status,
        transaction_id: req.transaction_id.clone(),
        payment_date: parse_timestamp(&now)?,
    })
}

pub fn get_payments_for_booking(conn: &Connection, booking_id: &str) -> anyhow::Result<Vec<Payment>> {
    let mut stmt = conn.prepare(
        "SELECT id, booking_id, amount, payment_method, payment_status, transaction_id, payment_date
         FROM payments WHERE booking_id = ?1 ORDER BY payment_date ASC, id ASC",
    )?;

    let rows = stmt.query_map(params![booking_id], |row| Ok(parse_payment_row(row)))?;

    let mut payments = vec![];
    for row in rows {
        payments.push(row??);
    }
    Ok(payments)
}

fn parse_payment_row(row: &rusqlite::Row) -> anyhow::Result<Payment> {
    let status_str: String = row.get(4)?;
    let payment_status = PaymentStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("invalid payment status: {status_str}"))?;
    let payment_date: String = row.get(6)?;

    Ok(Payment {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        amount: row.get(2)?,
        payment_method: row.get(3)?,
        payment_status,
        transaction_id: row.get(5)?,
        payment_date: parse_timestamp(&payment_date)?,
    })
}
