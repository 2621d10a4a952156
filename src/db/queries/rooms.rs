use chrono::NaiveDate;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::filter::{FilterField, Predicates};
use crate::db::{format_date, now_timestamp, parse_timestamp};
use crate::models::{CreateRoomRequest, Pagination, PriceType, Room, RoomFilter, RoomStats};

const ROOM_COLUMNS: &str = "id, homestay_id, name, description, room_type, capacity, price, price_type, is_active, created_at, updated_at";

#[derive(Clone, Copy)]
enum RoomField {
    HomestayId,
    Name,
    MinPrice,
    MaxPrice,
    MinCapacity,
    IsActive,
}

impl FilterField for RoomField {
    fn predicate(self) -> &'static str {
        match self {
            RoomField::HomestayId => "homestay_id = ?",
            RoomField::Name => "name LIKE ? ESCAPE '\\'",
            RoomField::MinPrice => "price >= ?",
            RoomField::MaxPrice => "price <= ?",
            RoomField::MinCapacity => "capacity >= ?",
            RoomField::IsActive => "is_active = ?",
        }
    }
}

pub fn create_room(conn: &Connection, req: &CreateRoomRequest) -> anyhow::Result<i64> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO rooms (homestay_id, name, description, room_type, capacity, price, price_type, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8)",
        params![
            req.homestay_id,
            req.name,
            req.description,
            req.room_type,
            req.capacity,
            req.price,
            req.price_type.as_str(),
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_room(conn: &Connection, id: i64) -> anyhow::Result<Option<Room>> {
    let result = conn
        .query_row(
            &format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ?1"),
            params![id],
            |row| Ok(parse_room_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn update_room(conn: &Connection, room: &Room) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE rooms SET name = ?1, description = ?2, room_type = ?3, capacity = ?4, price = ?5,
           price_type = ?6, is_active = ?7, updated_at = ?8
         WHERE id = ?9",
        params![
            room.name,
            room.description,
            room.room_type,
            room.capacity,
            room.price,
            room.price_type.as_str(),
            room.is_active,
            now_timestamp(),
            room.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_room(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM rooms WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

/// True if any booking, in any status, has a line item for this room.
pub fn is_room_referenced(conn: &Connection, room_id: i64) -> anyhow::Result<bool> {
    let referenced: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM booking_rooms WHERE room_id = ?1)",
        params![room_id],
        |row| row.get(0),
    )?;
    Ok(referenced)
}

/// Per-homestay room figures as of `date`. Occupied means an active room
/// booked that night; available means an active room neither booked nor
/// blocked. Revenue sums line items of non-cancelled bookings.
pub fn get_stats_for_homestay(
    conn: &Connection,
    homestay_id: i64,
    date: NaiveDate,
) -> anyhow::Result<RoomStats> {
    let mut stats = conn.query_row(
        "SELECT
           COUNT(*),
           COALESCE(SUM(r.is_active = 0), 0),
           COALESCE(SUM(r.is_active = 1 AND EXISTS (
             SELECT 1 FROM room_availability a
             WHERE a.room_id = r.id AND a.date = ?2 AND a.status = 'booked')), 0),
           COALESCE(SUM(r.is_active = 1 AND NOT EXISTS (
             SELECT 1 FROM room_availability a
             WHERE a.room_id = r.id AND a.date = ?2 AND a.status IN ('booked', 'blocked'))), 0),
           COALESCE(AVG(r.price), 0.0),
           (SELECT COALESCE(SUM(br.amount), 0)
              FROM booking_rooms br
              JOIN bookings b ON b.id = br.booking_id
              JOIN rooms r2 ON r2.id = br.room_id
             WHERE r2.homestay_id = ?1 AND b.status <> 'cancelled')
         FROM rooms r WHERE r.homestay_id = ?1",
        params![homestay_id, format_date(date)],
        |row| {
            Ok(RoomStats {
                date,
                total_rooms: row.get(0)?,
                maintenance_rooms: row.get(1)?,
                occupied_rooms: row.get(2)?,
                available_rooms: row.get(3)?,
                average_price: row.get(4)?,
                total_revenue: row.get(5)?,
                occupancy_rate: 0.0,
            })
        },
    )?;

    let active = stats.active_rooms();
    if active > 0 {
        stats.occupancy_rate = stats.occupied_rooms as f64 / active as f64;
    }
    Ok(stats)
}

pub fn search_rooms(
    conn: &Connection,
    filter: &RoomFilter,
    pagination: Pagination,
) -> anyhow::Result<(Vec<Room>, i64)> {
    let mut preds = Predicates::new();
    preds
        .push_opt(RoomField::HomestayId, filter.homestay_id)
        .push_contains(RoomField::Name, filter.name.as_deref())
        .push_opt(RoomField::MinPrice, filter.min_price)
        .push_opt(RoomField::MaxPrice, filter.max_price)
        .push_opt(RoomField::MinCapacity, filter.min_capacity)
        .push_opt(RoomField::IsActive, filter.is_active);

    let where_sql = preds.where_sql();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM rooms{where_sql}"),
        preds.params().as_slice(),
        |row| row.get(0),
    )?;

    let limit = pagination.page_size;
    let offset = pagination.offset();
    let mut stmt = conn.prepare(&format!(
        "SELECT {ROOM_COLUMNS} FROM rooms{where_sql} ORDER BY price ASC, id ASC LIMIT ? OFFSET ?"
    ))?;
    let tail: [&dyn ToSql; 2] = [&limit, &offset];
    let rows = stmt.query_map(preds.params_with(&tail).as_slice(), |row| {
        Ok(parse_room_row(row))
    })?;

    let mut rooms = vec![];
    for row in rows {
        rooms.push(row??);
    }
    Ok((rooms, total))
}

fn parse_room_row(row: &rusqlite::Row) -> anyhow::Result<Room> {
    let price_type_str: String = row.get(7)?;
    let price_type = PriceType::parse(&price_type_str)
        .ok_or_else(|| anyhow::anyhow!("invalid price type: {price_type_str}"))?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;

    Ok(Room {
        id: row.get(0)?,
        homestay_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        room_type: row.get(4)?,
        capacity: row.get(5)?,
        price: row.get(6)?,
        price_type,
        is_active: row.get(8)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
