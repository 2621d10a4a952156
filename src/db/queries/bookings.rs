use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::filter::{FilterField, Predicates};
use crate::db::{format_date, format_timestamp, now_timestamp, parse_date, parse_timestamp};
use crate::models::{Booking, BookingFilter, BookingRoom, BookingStatus, Pagination, PriceType};

const BOOKING_COLUMNS: &str = "b.id, b.user_id, b.homestay_id, b.customer_name, b.customer_email, b.customer_phone, b.check_in, b.check_out, b.num_guests, b.total_amount, b.status, b.notes, b.created_at, b.updated_at";

#[derive(Clone, Copy)]
enum BookingField {
    Status,
    CheckInFrom,
    CheckOutTo,
    CustomerName,
    RoomId,
    HomestayId,
    UserId,
}

impl FilterField for BookingField {
    fn predicate(self) -> &'static str {
        match self {
            BookingField::Status => "b.status = ?",
            BookingField::CheckInFrom => "b.check_in >= ?",
            BookingField::CheckOutTo => "b.check_out <= ?",
            BookingField::CustomerName => "b.customer_name LIKE ? ESCAPE '\\'",
            BookingField::RoomId => {
                "EXISTS (SELECT 1 FROM booking_rooms br WHERE br.booking_id = b.id AND br.room_id = ?)"
            }
            BookingField::HomestayId => "b.homestay_id = ?",
            BookingField::UserId => "b.user_id = ?",
        }
    }
}

/// Inserts the parent row and every line item. Run inside a transaction so
/// the aggregate appears all at once.
pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, user_id, homestay_id, customer_name, customer_email, customer_phone,
           check_in, check_out, num_guests, total_amount, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            booking.id,
            booking.user_id,
            booking.homestay_id,
            booking.customer_name,
            booking.customer_email,
            booking.customer_phone,
            format_date(booking.check_in),
            format_date(booking.check_out),
            booking.num_guests,
            booking.total_amount,
            booking.status.as_str(),
            booking.notes,
            format_timestamp(booking.created_at),
            format_timestamp(booking.updated_at),
        ],
    )?;

    let mut stmt = conn.prepare(
        "INSERT INTO booking_rooms (booking_id, room_id, capacity, price, price_type, amount)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for room in &booking.rooms {
        stmt.execute(params![
            booking.id,
            room.room_id,
            room.capacity,
            room.price,
            room.price_type.as_str(),
            room.amount,
        ])?;
    }
    Ok(())
}

pub fn get_booking(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings b WHERE b.id = ?1"),
            params![id],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;

    match result {
        Some(booking) => {
            let mut booking = booking?;
            booking.rooms = get_booking_rooms(conn, &booking.id)?;
            Ok(Some(booking))
        }
        None => Ok(None),
    }
}

pub fn get_booking_rooms(conn: &Connection, booking_id: &str) -> anyhow::Result<Vec<BookingRoom>> {
    let mut stmt = conn.prepare(
        "SELECT room_id, capacity, price, price_type, amount
         FROM booking_rooms WHERE booking_id = ?1 ORDER BY room_id ASC",
    )?;

    let rows = stmt.query_map(params![booking_id], |row| {
        let price_type: String = row.get(3)?;
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
            price_type,
            row.get::<_, i64>(4)?,
        ))
    })?;

    let mut rooms = vec![];
    for row in rows {
        let (room_id, capacity, price, price_type, amount) = row?;
        let price_type = PriceType::parse(&price_type)
            .ok_or_else(|| anyhow::anyhow!("invalid price type: {price_type}"))?;
        rooms.push(BookingRoom {
            room_id,
            capacity,
            price,
            price_type,
            amount,
        });
    }
    Ok(rooms)
}

/// Compare-and-set on the status column. Returns false if the booking is
/// no longer in `expected`.
pub fn update_status_if(
    conn: &Connection,
    id: &str,
    expected: BookingStatus,
    next: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        params![next.as_str(), now_timestamp(), id, expected.as_str()],
    )?;
    Ok(count > 0)
}

pub fn search_bookings(
    conn: &Connection,
    filter: &BookingFilter,
    user_id: Option<i64>,
    pagination: Pagination,
) -> anyhow::Result<(Vec<Booking>, i64)> {
    let mut preds = Predicates::new();
    preds
        .push_opt(BookingField::Status, filter.status.map(|s| s.as_str()))
        .push_opt(BookingField::CheckInFrom, filter.date_from.map(format_date))
        .push_opt(BookingField::CheckOutTo, filter.date_to.map(format_date))
        .push_contains(BookingField::CustomerName, filter.customer_name.as_deref())
        .push_opt(BookingField::RoomId, filter.room_id)
        .push_opt(BookingField::HomestayId, filter.homestay_id)
        .push_opt(BookingField::UserId, user_id);

    let where_sql = preds.where_sql();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM bookings b{where_sql}"),
        preds.params().as_slice(),
        |row| row.get(0),
    )?;

    let limit = pagination.page_size;
    let offset = pagination.offset();
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings b{where_sql}
         ORDER BY b.created_at DESC, b.id ASC LIMIT ? OFFSET ?"
    ))?;
    let tail: [&dyn ToSql; 2] = [&limit, &offset];
    let rows = stmt.query_map(preds.params_with(&tail).as_slice(), |row| {
        Ok(parse_booking_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    for booking in &mut bookings {
        booking.rooms = get_booking_rooms(conn, &booking.id)?;
    }
    Ok((bookings, total))
}

/// Parsed without line items; callers attach them.
fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let check_in: String = row.get(6)?;
    let check_out: String = row.get(7)?;
    let status_str: String = row.get(10)?;
    let created_at: String = row.get(12)?;
    let updated_at: String = row.get(13)?;

    let status = BookingStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("invalid booking status: {status_str}"))?;

    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        homestay_id: row.get(2)?,
        customer_name: row.get(3)?,
        customer_email: row.get(4)?,
        customer_phone: row.get(5)?,
        check_in: parse_date(&check_in)?,
        check_out: parse_date(&check_out)?,
        num_guests: row.get(8)?,
        total_amount: row.get(9)?,
        status,
        notes: row.get(11)?,
        rooms: vec![],
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
