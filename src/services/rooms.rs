use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::{queries, required};
use crate::errors::{AppError, AppResult};
use crate::models::{
    Actor, Capability, CreateRoomRequest, Page, Pagination, Room, RoomFilter, RoomStats,
    UpdateRoomRequest, MAX_CAPACITY, MAX_PRICE,
};
use crate::services::access;

pub fn create_room(conn: &Connection, actor: &Actor, req: &CreateRoomRequest) -> AppResult<Room> {
    access::owned_homestay(conn, actor, req.homestay_id, Capability::ManageProperty)?;
    if req.name.trim().is_empty() {
        return Err(AppError::validation("name is required"));
    }
    validate_pricing(req.capacity, req.price)?;

    let id = queries::rooms::create_room(conn, req)?;
    tracing::info!(room_id = id, homestay_id = req.homestay_id, "room created");
    get_room(conn, id)
}

pub fn get_room(conn: &Connection, id: i64) -> AppResult<Room> {
    required(queries::rooms::get_room(conn, id)?, || format!("room {id}"))
}

/// Loads a room whose homestay the actor may act on with `capability`.
pub fn owned_room(conn: &Connection, actor: &Actor, id: i64, capability: Capability) -> AppResult<Room> {
    let room = get_room(conn, id)?;
    access::owned_homestay(conn, actor, room.homestay_id, capability)?;
    Ok(room)
}

/// Capacity, price and price type are frozen once a booking references the
/// room; descriptive fields stay editable.
pub fn update_room(
    conn: &Connection,
    actor: &Actor,
    id: i64,
    req: &UpdateRoomRequest,
) -> AppResult<Room> {
    let mut room = owned_room(conn, actor, id, Capability::ManageProperty)?;

    if req.touches_pricing() && queries::rooms::is_room_referenced(conn, id)? {
        return Err(AppError::conflict(format!(
            "room {id} is referenced by a booking; capacity and pricing are locked"
        )));
    }

    if let Some(name) = &req.name {
        if name.trim().is_empty() {
            return Err(AppError::validation("name must not be empty"));
        }
        room.name = name.clone();
    }
    if let Some(description) = &req.description {
        room.description = description.clone();
    }
    if let Some(room_type) = &req.room_type {
        room.room_type = room_type.clone();
    }
    room.capacity = req.capacity.unwrap_or(room.capacity);
    room.price = req.price.unwrap_or(room.price);
    room.price_type = req.price_type.unwrap_or(room.price_type);
    room.is_active = req.is_active.unwrap_or(room.is_active);
    validate_pricing(room.capacity, room.price)?;

    queries::rooms::update_room(conn, &room)?;
    get_room(conn, id)
}

/// Referenced rooms cannot be deleted; deactivate them instead.
pub fn delete_room(conn: &Connection, actor: &Actor, id: i64) -> AppResult<()> {
    owned_room(conn, actor, id, Capability::ManageProperty)?;
    if queries::rooms::is_room_referenced(conn, id)? {
        return Err(AppError::conflict(format!(
            "room {id} is referenced by a booking; set is_active to false instead"
        )));
    }

    let tx = conn.unchecked_transaction()?;
    queries::availability::delete_days_for_room(&tx, id)?;
    queries::rooms::delete_room(&tx, id)?;
    tx.commit()?;

    tracing::info!(room_id = id, "room deleted");
    Ok(())
}

pub fn search_rooms(
    conn: &Connection,
    filter: &RoomFilter,
    pagination: Pagination,
) -> AppResult<Page<Room>> {
    let pagination = pagination.validated()?;
    if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
        if min > max {
            return Err(AppError::validation("min_price must not exceed max_price"));
        }
    }
    let (items, total) = queries::rooms::search_rooms(conn, filter, pagination)?;
    Ok(Page::new(items, total, pagination))
}

pub fn room_stats(
    conn: &Connection,
    actor: &Actor,
    homestay_id: i64,
    date: NaiveDate,
) -> AppResult<RoomStats> {
    access::owned_homestay(conn, actor, homestay_id, Capability::ManageProperty)?;
    Ok(queries::rooms::get_stats_for_homestay(conn, homestay_id, date)?)
}

fn validate_pricing(capacity: i64, price: i64) -> AppResult<()> {
    if !(1..=MAX_CAPACITY).contains(&capacity) {
        return Err(AppError::validation(format!(
            "capacity must be between 1 and {MAX_CAPACITY}"
        )));
    }
    if !(0..=MAX_PRICE).contains(&price) {
        return Err(AppError::validation(format!(
            "price must be between 0 and {MAX_PRICE}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::db;
    use crate::models::{AvailabilityStatus, BookingStatus, PriceType, Role};
    use crate::services::fixtures;

    fn host_with_homestay(conn: &Connection) -> (Actor, i64) {
        let host = Actor {
            user_id: fixtures::seed_user(conn, Role::Host),
            role: Role::Host,
        };
        let homestay = fixtures::seed_homestay(conn, host.user_id);
        (host, homestay)
    }

    fn create_request(homestay_id: i64) -> CreateRoomRequest {
        CreateRoomRequest {
            homestay_id,
            name: "Garden View".to_string(),
            description: String::new(),
            room_type: "double".to_string(),
            capacity: 2,
            price: 450_000,
            price_type: PriceType::PerNight,
        }
    }

    fn reference_room(conn: &Connection, room: &Room) {
        let d = |day| NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
        fixtures::seed_booking(conn, room, d(1), d(2), room.price, BookingStatus::Confirmed);
    }

    #[test]
    fn test_create_validates_and_checks_owner() {
        let conn = db::init_db(":memory:").unwrap();
        let (host, homestay) = host_with_homestay(&conn);
        let (other, _) = host_with_homestay(&conn);

        let room = create_room(&conn, &host, &create_request(homestay)).unwrap();
        assert_eq!(room.capacity, 2);
        assert!(room.is_active);

        let mut bad = create_request(homestay);
        bad.capacity = 0;
        assert!(matches!(create_room(&conn, &host, &bad), Err(AppError::Validation(_))));
        bad.capacity = MAX_CAPACITY + 1;
        assert!(matches!(create_room(&conn, &host, &bad), Err(AppError::Validation(_))));
        let mut bad = create_request(homestay);
        bad.price = MAX_PRICE + 1;
        assert!(matches!(create_room(&conn, &host, &bad), Err(AppError::Validation(_))));
        assert!(matches!(
            create_room(&conn, &other, &create_request(homestay)),
            Err(AppError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_pricing_locked_once_referenced() {
        let conn = db::init_db(":memory:").unwrap();
        let (host, homestay) = host_with_homestay(&conn);
        let room = create_room(&conn, &host, &create_request(homestay)).unwrap();
        reference_room(&conn, &room);

        let price_change = UpdateRoomRequest {
            price: Some(999_000),
            ..Default::default()
        };
        assert!(matches!(
            update_room(&conn, &host, room.id, &price_change),
            Err(AppError::Conflict(_))
        ));

        let rename = UpdateRoomRequest {
            name: Some("Sunrise".to_string()),
            is_active: Some(false),
            ..Default::default()
        };
        let updated = update_room(&conn, &host, room.id, &rename).unwrap();
        assert_eq!(updated.name, "Sunrise");
        assert!(!updated.is_active);
        assert_eq!(updated.price, 450_000);
    }

    #[test]
    fn test_delete_refused_when_referenced() {
        let conn = db::init_db(":memory:").unwrap();
        let (host, homestay) = host_with_homestay(&conn);
        let referenced = create_room(&conn, &host, &create_request(homestay)).unwrap();
        let spare = create_room(&conn, &host, &create_request(homestay)).unwrap();
        reference_room(&conn, &referenced);

        assert!(matches!(
            delete_room(&conn, &host, referenced.id),
            Err(AppError::Conflict(_))
        ));
        delete_room(&conn, &host, spare.id).unwrap();
        assert!(matches!(get_room(&conn, spare.id), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_search_by_price_and_capacity() {
        let conn = db::init_db(":memory:").unwrap();
        let (host, homestay) = host_with_homestay(&conn);
        for (price, capacity) in [(200_000, 1), (450_000, 2), (900_000, 4)] {
            let mut req = create_request(homestay);
            req.price = price;
            req.capacity = capacity;
            create_room(&conn, &host, &req).unwrap();
        }

        let filter = RoomFilter {
            homestay_id: Some(homestay),
            min_price: Some(300_000),
            min_capacity: Some(2),
            ..Default::default()
        };
        let page = search_rooms(&conn, &filter, Pagination::default()).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].price, 450_000);

        let inverted = RoomFilter {
            min_price: Some(10),
            max_price: Some(1),
            ..Default::default()
        };
        assert!(matches!(
            search_rooms(&conn, &inverted, Pagination::default()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_room_stats_for_a_night() {
        let conn = db::init_db(":memory:").unwrap();
        let (host, homestay) = host_with_homestay(&conn);
        let (other, _) = host_with_homestay(&conn);
        let d = |day| NaiveDate::from_ymd_opt(2024, 6, day).unwrap();

        let booked = fixtures::seed_room_in(&conn, homestay, 400_000, PriceType::PerNight, 2);
        let blocked = fixtures::seed_room_in(&conn, homestay, 500_000, PriceType::PerNight, 2);
        fixtures::seed_room_in(&conn, homestay, 600_000, PriceType::PerNight, 2);
        let closed = fixtures::seed_room_in(&conn, homestay, 700_000, PriceType::PerNight, 2);
        let close = UpdateRoomRequest {
            is_active: Some(false),
            ..Default::default()
        };
        update_room(&conn, &host, closed.id, &close).unwrap();
        queries::availability::upsert_day(&conn, blocked.id, d(1), AvailabilityStatus::Blocked, None).unwrap();
        fixtures::seed_booking(&conn, &booked, d(1), d(3), 800_000, BookingStatus::Confirmed);
        fixtures::seed_booking(&conn, &blocked, d(10), d(11), 500_000, BookingStatus::Cancelled);

        let stats = room_stats(&conn, &host, homestay, d(1)).unwrap();
        assert_eq!(stats.total_rooms, 4);
        assert_eq!(stats.maintenance_rooms, 1);
        assert_eq!(stats.occupied_rooms, 1);
        assert_eq!(stats.available_rooms, 1);
        assert_eq!(stats.average_price, 550_000.0);
        assert_eq!(stats.total_revenue, 800_000);
        assert!((stats.occupancy_rate - 1.0 / 3.0).abs() < 1e-9);

        let later = room_stats(&conn, &host, homestay, d(5)).unwrap();
        assert_eq!(later.occupied_rooms, 0);
        assert_eq!(later.available_rooms, 3);
        assert_eq!(later.occupancy_rate, 0.0);

        assert!(matches!(
            room_stats(&conn, &other, homestay, d(1)),
            Err(AppError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_room_stats_for_empty_homestay() {
        let conn = db::init_db(":memory:").unwrap();
        let (host, homestay) = host_with_homestay(&conn);
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let stats = room_stats(&conn, &host, homestay, date).unwrap();
        assert_eq!(stats.total_rooms, 0);
        assert_eq!(stats.average_price, 0.0);
        assert_eq!(stats.occupancy_rate, 0.0);
    }
}
