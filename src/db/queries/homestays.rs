use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::filter::{FilterField, Predicates};
use crate::db::{now_timestamp, parse_timestamp};
use crate::models::{
    CreateHomestayRequest, Homestay, HomestayFilter, HomestayStats, HomestayStatus, Pagination,
};

const HOMESTAY_COLUMNS: &str = "id, owner_id, name, description, address, city, district, ward, latitude, longitude, status, created_at, updated_at";

#[derive(Clone, Copy)]
enum HomestayField {
    Name,
    City,
    District,
    Status,
    OwnerId,
}

impl FilterField for HomestayField {
    fn predicate(self) -> &'static str {
        match self {
            HomestayField::Name => "name LIKE ? ESCAPE '\\'",
            HomestayField::City => "city = ?",
            HomestayField::District => "district = ?",
            HomestayField::Status => "status = ?",
            HomestayField::OwnerId => "owner_id = ?",
        }
    }
}

pub fn create_homestay(
    conn: &Connection,
    owner_id: i64,
    req: &CreateHomestayRequest,
) -> anyhow::Result<i64> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO homestays (owner_id, name, description, address, city, district, ward, latitude, longitude, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'active', ?10, ?10)",
        params![
            owner_id,
            req.name,
            req.description,
            req.address,
            req.city,
            req.district,
            req.ward,
            req.latitude,
            req.longitude,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_homestay(conn: &Connection, id: i64) -> anyhow::Result<Option<Homestay>> {
    let result = conn
        .query_row(
            &format!("SELECT {HOMESTAY_COLUMNS} FROM homestays WHERE id = ?1"),
            params![id],
            |row| Ok(parse_homestay_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn update_homestay(conn: &Connection, homestay: &Homestay) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE homestays SET name = ?1, description = ?2, address = ?3, city = ?4, district = ?5,
           ward = ?6, latitude = ?7, longitude = ?8, status = ?9, updated_at = ?10
         WHERE id = ?11",
        params![
            homestay.name,
            homestay.description,
            homestay.address,
            homestay.city,
            homestay.district,
            homestay.ward,
            homestay.latitude,
            homestay.longitude,
            homestay.status.as_str(),
            now_timestamp(),
            homestay.id,
        ],
    )?;
    Ok(count > 0)
}

/// Removes the homestay with its rooms, calendars and reviews. Callers must
/// have checked that no booking references any of its rooms.
pub fn delete_homestay_cascade(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    conn.execute(
        "DELETE FROM room_availability WHERE room_id IN (SELECT id FROM rooms WHERE homestay_id = ?1)",
        params![id],
    )?;
    conn.execute("DELETE FROM rooms WHERE homestay_id = ?1", params![id])?;
    conn.execute("DELETE FROM reviews WHERE homestay_id = ?1", params![id])?;
    let count = conn.execute("DELETE FROM homestays WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn has_bookings(conn: &Connection, homestay_id: i64) -> anyhow::Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM bookings WHERE homestay_id = ?1)",
        params![homestay_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Which homestays a stats query aggregates over.
#[derive(Debug, Clone, Copy)]
pub enum StatsScope {
    Owner(i64),
    Homestay(i64),
}

impl StatsScope {
    fn predicate(self) -> (&'static str, i64) {
        match self {
            StatsScope::Owner(owner_id) => ("h.owner_id = ?1", owner_id),
            StatsScope::Homestay(id) => ("h.id = ?1", id),
        }
    }
}

pub fn get_stats(conn: &Connection, scope: StatsScope) -> anyhow::Result<HomestayStats> {
    let (scope_sql, id) = scope.predicate();
    let sql = format!(
        "SELECT
           COUNT(*),
           COALESCE(SUM(h.status = 'active'), 0),
           (SELECT COUNT(*) FROM rooms r JOIN homestays h ON h.id = r.homestay_id
             WHERE {scope_sql}),
           (SELECT COUNT(*) FROM rooms r JOIN homestays h ON h.id = r.homestay_id
             WHERE {scope_sql} AND r.is_active = 1),
           (SELECT COUNT(*) FROM bookings b JOIN homestays h ON h.id = b.homestay_id
             WHERE {scope_sql} AND b.status <> 'cancelled'),
           (SELECT COALESCE(SUM(b.total_amount), 0) FROM bookings b JOIN homestays h ON h.id = b.homestay_id
             WHERE {scope_sql} AND b.status <> 'cancelled')
         FROM homestays h WHERE {scope_sql}"
    );

    let stats = conn.query_row(&sql, params![id], |row| {
        Ok(HomestayStats {
            total_homestays: row.get(0)?,
            active_homestays: row.get(1)?,
            total_rooms: row.get(2)?,
            available_rooms: row.get(3)?,
            total_bookings: row.get(4)?,
            total_revenue: row.get(5)?,
        })
    })?;
    Ok(stats)
}

pub fn search_homestays(
    conn: &Connection,
    filter: &HomestayFilter,
    pagination: Pagination,
) -> anyhow::Result<(Vec<Homestay>, i64)> {
    let mut preds = Predicates::new();
    preds
        .push_contains(HomestayField::Name, filter.name.as_deref())
        .push_opt(HomestayField::City, filter.city.clone())
        .push_opt(HomestayField::District, filter.district.clone())
        .push_opt(HomestayField::Status, filter.status.map(|s| s.as_str()))
        .push_opt(HomestayField::OwnerId, filter.owner_id);

    let where_sql = preds.where_sql();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM homestays{where_sql}"),
        preds.params().as_slice(),
        |row| row.get(0),
    )?;

    let limit = pagination.page_size;
    let offset = pagination.offset();
    let mut stmt = conn.prepare(&format!(
        "SELECT {HOMESTAY_COLUMNS} FROM homestays{where_sql} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
    ))?;
    let tail: [&dyn ToSql; 2] = [&limit, &offset];
    let rows = stmt.query_map(preds.params_with(&tail).as_slice(), |row| {
        Ok(parse_homestay_row(row))
    })?;

    let mut homestays = vec![];
    for row in rows {
        homestays.push(row??);
    }
    Ok((homestays, total))
}

fn parse_homestay_row(row: &rusqlite::Row) -> anyhow::Result<Homestay> {
    let status_str: String = row.get(10)?;
    let status = HomestayStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("invalid homestay status: {status_str}"))?;
    let created_at: String = row.get(11)?;
    let updated_at: String = row.get(12)?;

    Ok(Homestay {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        address: row.get(4)?,
        city: row.get(5)?,
        district: row.get(6)?,
        ward: row.get(7)?,
        latitude: row.get(8)?,
        longitude: row.get(9)?,
        status,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
