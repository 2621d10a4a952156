use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{format_date, now_timestamp, parse_date};
use crate::models::{AvailabilityDay, AvailabilityStatus};

const DAY_COLUMNS: &str = "room_id, date, status, price_override, booking_id";

/// Explicit records for `room_id` in `[start, end)`, oldest first.
pub fn get_days_in_range(
    conn: &Connection,
    room_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<Vec<AvailabilityDay>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DAY_COLUMNS} FROM room_availability
         WHERE room_id = ?1 AND date >= ?2 AND date < ?3
         ORDER BY date ASC"
    ))?;

    let rows = stmt.query_map(
        params![room_id, format_date(start), format_date(end)],
        |row| Ok(parse_day_row(row)),
    )?;

    let mut days = vec![];
    for row in rows {
        days.push(row??);
    }
    Ok(days)
}

pub fn get_day(
    conn: &Connection,
    room_id: i64,
    date: NaiveDate,
) -> anyhow::Result<Option<AvailabilityDay>> {
    let result = conn
        .query_row(
            &format!("SELECT {DAY_COLUMNS} FROM room_availability WHERE room_id = ?1 AND date = ?2"),
            params![room_id, format_date(date)],
            |row| Ok(parse_day_row(row)),
        )
        .optional()?;

    result.transpose()
}

/// Dates in `[start, end)` that are booked or blocked.
pub fn find_unavailable_dates(
    conn: &Connection,
    room_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<Vec<NaiveDate>> {
    let mut stmt = conn.prepare(
        "SELECT date FROM room_availability
         WHERE room_id = ?1 AND date >= ?2 AND date < ?3 AND status IN ('booked', 'blocked')
         ORDER BY date ASC",
    )?;

    let rows = stmt.query_map(
        params![room_id, format_date(start), format_date(end)],
        |row| row.get::<_, String>(0),
    )?;

    let mut dates = vec![];
    for row in rows {
        dates.push(parse_date(&row?)?);
    }
    Ok(dates)
}

/// Conditional transition `absent | available → booked`. Returns false when
/// the date is already booked or blocked, leaving it untouched.
pub fn mark_booked(
    conn: &Connection,
    room_id: i64,
    date: NaiveDate,
    booking_id: &str,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "INSERT INTO room_availability (room_id, date, status, booking_id, updated_at)
         VALUES (?1, ?2, 'booked', ?3, ?4)
         ON CONFLICT(room_id, date) DO UPDATE SET
           status = 'booked',
           booking_id = excluded.booking_id,
           updated_at = excluded.updated_at
         WHERE room_availability.status = 'available'",
        params![room_id, format_date(date), booking_id, now_timestamp()],
    )?;
    Ok(count == 1)
}

/// Returns dates in `[start, end)` held by `booking_id` to `available`.
pub fn release_booked(
    conn: &Connection,
    room_id: i64,
    start: NaiveDate,
    end: NaiveDate,
    booking_id: &str,
) -> anyhow::Result<usize> {
    let count = conn.execute(
        "UPDATE room_availability
         SET status = 'available', booking_id = NULL, updated_at = ?5
         WHERE room_id = ?1 AND date >= ?2 AND date < ?3
           AND status = 'booked' AND booking_id = ?4",
        params![
            room_id,
            format_date(start),
            format_date(end),
            booking_id,
            now_timestamp()
        ],
    )?;
    Ok(count)
}

/// Host calendar write. Clears any booking holder, so callers must have
/// decided already whether overwriting a booked date is allowed.
pub fn upsert_day(
    conn: &Connection,
    room_id: i64,
    date: NaiveDate,
    status: AvailabilityStatus,
    price_override: Option<i64>,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO room_availability (room_id, date, status, price_override, booking_id, updated_at)
         VALUES (?1, ?2, ?3, ?4, NULL, ?5)
         ON CONFLICT(room_id, date) DO UPDATE SET
           status = excluded.status,
           price_override = excluded.price_override,
           booking_id = NULL,
           updated_at = excluded.updated_at",
        params![
            room_id,
            format_date(date),
            status.as_str(),
            price_override,
            now_timestamp()
        ],
    )?;
    Ok(())
}

pub fn delete_days_for_room(conn: &Connection, room_id: i64) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM room_availability WHERE room_id = ?1",
        params![room_id],
    )?;
    Ok(count)
}

fn parse_day_row(row: &rusqlite::Row) -> anyhow::Result<AvailabilityDay> {
    let room_id: i64 = row.get(0)?;
    let date_str: String = row.get(1)?;
    let status_str: String = row.get(2)?;
    let price_override: Option<i64> = row.get(3)?;
    let booking_id: Option<String> = row.get(4)?;

    let status = AvailabilityStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("invalid availability status: {status_str}"))?;

    Ok(AvailabilityDay {
        room_id,
        date: parse_date(&date_str)?,
        status,
        price_override,
        booking_id,
    })
}
