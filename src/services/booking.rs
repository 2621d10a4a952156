use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, TransactionBehavior};

use crate::db::{self, queries, required};
use crate::errors::{AppError, AppResult};
use crate::models::{
    Actor, Booking, BookingDetail, BookingFilter, BookingRoom, BookingStatus, Capability,
    CreateBookingRequest, Page, Pagination, PaymentStatus, PriceType, Room,
};
use crate::services::access;
use crate::services::ledger::AvailabilityLedger;

/// Creates bookings and serves the read side of the booking aggregate.
pub struct BookingWorkflow {
    db: Arc<Mutex<Connection>>,
    ledger: Arc<AvailabilityLedger>,
}

/// Rooms reserved so far for one booking attempt. Dropping the guard without
/// `commit` releases all of them, whatever the exit path.
struct ReservationGuard<'a> {
    ledger: &'a AvailabilityLedger,
    booking_id: &'a str,
    check_in: NaiveDate,
    check_out: NaiveDate,
    reserved: Vec<i64>,
    committed: bool,
}

impl<'a> ReservationGuard<'a> {
    fn new(
        ledger: &'a AvailabilityLedger,
        booking_id: &'a str,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Self {
        Self {
            ledger,
            booking_id,
            check_in,
            check_out,
            reserved: vec![],
            committed: false,
        }
    }

    fn reserve(&mut self, room_id: i64) -> AppResult<()> {
        self.ledger
            .reserve(room_id, self.check_in, self.check_out, self.booking_id)?;
        self.reserved.push(room_id);
        Ok(())
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for ReservationGuard<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for room_id in &self.reserved {
            if let Err(e) =
                self.ledger
                    .release(*room_id, self.check_in, self.check_out, self.booking_id)
            {
                tracing::error!(
                    room_id,
                    booking_id = self.booking_id,
                    error = %e,
                    "failed to release reservation"
                );
            }
        }
        if !self.reserved.is_empty() {
            tracing::info!(
                booking_id = self.booking_id,
                rooms = self.reserved.len(),
                "rolled back reservations"
            );
        }
    }
}

impl BookingWorkflow {
    pub fn new(db: Arc<Mutex<Connection>>, ledger: Arc<AvailabilityLedger>) -> Self {
        Self { db, ledger }
    }

    /// Validates the request, reserves every room over `[check_in, check_out)`
    /// and persists a confirmed booking. On any failure the reservations made
    /// so far are released before the error is returned.
    pub fn create_booking(
        &self,
        actor: Option<&Actor>,
        req: &CreateBookingRequest,
    ) -> AppResult<Booking> {
        self.validate_request(req)?;

        let (user_id, rooms) = {
            let conn = db::lock(&self.db)?;
            let user_id = match actor {
                Some(actor) => {
                    access::require(actor, Capability::CreateBooking)?;
                    if queries::users::get_user(&conn, actor.user_id)?.is_none() {
                        return Err(AppError::Unauthorized);
                    }
                    Some(actor.user_id)
                }
                None => None,
            };
            (user_id, load_rooms(&conn, req)?)
        };

        for (room, _) in &rooms {
            if !self.ledger.is_range_free(room.id, req.check_in, req.check_out)? {
                return Err(AppError::conflict(format!(
                    "room {} is not available from {} to {}",
                    room.id, req.check_in, req.check_out
                )));
            }
        }

        let booking_id = uuid::Uuid::new_v4().to_string();
        let mut guard = ReservationGuard::new(&self.ledger, &booking_id, req.check_in, req.check_out);
        for (room, _) in &rooms {
            guard.reserve(room.id)?;
        }

        let mut lines = Vec::with_capacity(rooms.len());
        for (room, capacity) in &rooms {
            let amount = match room.price_type {
                PriceType::PerNight => checked_sum(
                    self.ledger
                        .nightly_prices(room, req.check_in, req.check_out)?
                        .into_iter()
                        .map(|(_, price)| price),
                )?,
                PriceType::PerPerson => room
                    .price
                    .checked_mul(req.num_guests)
                    .ok_or_else(amount_out_of_range)?,
            };
            lines.push(BookingRoom {
                room_id: room.id,
                capacity: *capacity,
                price: room.price,
                price_type: room.price_type,
                amount,
            });
        }

        let total_amount = checked_sum(lines.iter().map(|line| line.amount))?;

        let now = Utc::now().naive_utc();
        let booking = Booking {
            id: booking_id.clone(),
            user_id,
            homestay_id: rooms[0].0.homestay_id,
            customer_name: req.guest.name.trim().to_string(),
            customer_email: req.guest.email.clone(),
            customer_phone: req.guest.phone.trim().to_string(),
            check_in: req.check_in,
            check_out: req.check_out,
            num_guests: req.num_guests,
            total_amount,
            status: BookingStatus::Confirmed,
            notes: req.notes.clone(),
            rooms: lines,
            created_at: now,
            updated_at: now,
        };

        {
            let mut conn = db::lock(&self.db)?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            queries::bookings::insert_booking(&tx, &booking)?;
            tx.commit()?;
        }
        guard.commit();

        tracing::info!(
            booking_id = %booking.id,
            homestay_id = booking.homestay_id,
            rooms = booking.rooms.len(),
            nights = booking.nights(),
            total_amount = booking.total_amount,
            "booking created"
        );
        Ok(booking)
    }

    /// Same workflow for a guest who is not signed in.
    pub fn create_guest_booking(&self, req: &CreateBookingRequest) -> AppResult<Booking> {
        self.create_booking(None, req)
    }

    pub fn get_booking_detail(&self, booking_id: &str) -> AppResult<BookingDetail> {
        let conn = db::lock(&self.db)?;
        let booking = required(queries::bookings::get_booking(&conn, booking_id)?, || {
            format!("booking {booking_id}")
        })?;
        let payments = queries::payments::get_payments_for_booking(&conn, booking_id)?;
        let paid_amount = payments
            .iter()
            .filter(|p| p.payment_status == PaymentStatus::Completed)
            .map(|p| p.amount)
            .sum();

        Ok(BookingDetail {
            booking,
            payments,
            paid_amount,
        })
    }

    /// `user_id` narrows the search to one guest's bookings.
    pub fn filter_bookings(
        &self,
        filter: &BookingFilter,
        user_id: Option<i64>,
        pagination: Pagination,
    ) -> AppResult<Page<Booking>> {
        let pagination = pagination.validated()?;
        if let (Some(from), Some(to)) = (filter.date_from, filter.date_to) {
            if from > to {
                return Err(AppError::validation("date_from must not be after date_to"));
            }
        }

        let conn = db::lock(&self.db)?;
        let (bookings, total) = queries::bookings::search_bookings(&conn, filter, user_id, pagination)?;
        Ok(Page::new(bookings, total, pagination))
    }

    fn validate_request(&self, req: &CreateBookingRequest) -> AppResult<()> {
        if req.check_in >= req.check_out {
            return Err(AppError::validation("check_in must be before check_out"));
        }
        let stay = (req.check_out - req.check_in).num_days();
        if stay > self.ledger.max_calendar_days() {
            return Err(AppError::validation(format!(
                "stay of {stay} nights exceeds the limit of {} nights",
                self.ledger.max_calendar_days()
            )));
        }
        if req.num_guests < 1 {
            return Err(AppError::validation("num_guests must be at least 1"));
        }
        if req.rooms.is_empty() {
            return Err(AppError::validation("at least one room is required"));
        }
        let mut seen = HashSet::new();
        for room in &req.rooms {
            if !seen.insert(room.room_id) {
                return Err(AppError::validation(format!(
                    "room {} is listed more than once",
                    room.room_id
                )));
            }
        }
        if req.guest.name.trim().is_empty() {
            return Err(AppError::validation("guest name is required"));
        }
        if req.guest.phone.trim().is_empty() {
            return Err(AppError::validation("guest phone is required"));
        }
        Ok(())
    }
}

/// Loads and checks every requested room, pairing it with the declared
/// capacity.
fn load_rooms(conn: &Connection, req: &CreateBookingRequest) -> AppResult<Vec<(Room, i64)>> {
    let room_count = req.rooms.len() as i64;
    let min_capacity = (req.num_guests + room_count - 1) / room_count;

    let mut rooms: Vec<(Room, i64)> = Vec::with_capacity(req.rooms.len());
    for requested in &req.rooms {
        let room = required(queries::rooms::get_room(conn, requested.room_id)?, || {
            format!("room {}", requested.room_id)
        })?;

        if !room.is_active {
            return Err(AppError::validation(format!("room {} is not active", room.id)));
        }
        if let Some((first, _)) = rooms.first() {
            if first.homestay_id != room.homestay_id {
                return Err(AppError::validation(
                    "all rooms must belong to the same homestay",
                ));
            }
        }
        if requested.capacity < 1 || requested.capacity > room.capacity {
            return Err(AppError::validation(format!(
                "room {} accepts between 1 and {} guests",
                room.id, room.capacity
            )));
        }
        if requested.capacity < min_capacity {
            return Err(AppError::validation(format!(
                "room {} needs capacity for at least {min_capacity} guests",
                room.id
            )));
        }
        rooms.push((room, requested.capacity));
    }
    Ok(rooms)
}

fn checked_sum(amounts: impl IntoIterator<Item = i64>) -> AppResult<i64> {
    amounts
        .into_iter()
        .try_fold(0i64, |acc, amount| acc.checked_add(amount))
        .ok_or_else(amount_out_of_range)
}

fn amount_out_of_range() -> AppError {
    AppError::validation("total amount out of range")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AvailabilityStatus, GuestInfo, Role, RoomRequest};
    use crate::services::fixtures;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    struct Setup {
        db: Arc<Mutex<Connection>>,
        ledger: Arc<AvailabilityLedger>,
        workflow: BookingWorkflow,
    }

    fn setup() -> Setup {
        let conn = db::init_db(":memory:").unwrap();
        let db = Arc::new(Mutex::new(conn));
        let ledger = Arc::new(AvailabilityLedger::new(Arc::clone(&db), 366));
        let workflow = BookingWorkflow::new(Arc::clone(&db), Arc::clone(&ledger));
        Setup { db, ledger, workflow }
    }

    fn request(rooms: &[(i64, i64)], check_in: &str, check_out: &str, num_guests: i64) -> CreateBookingRequest {
        CreateBookingRequest {
            guest: GuestInfo {
                name: "Nguyen Van A".to_string(),
                email: Some("a@example.com".to_string()),
                phone: "0900000000".to_string(),
            },
            check_in: d(check_in),
            check_out: d(check_out),
            num_guests,
            notes: None,
            rooms: rooms
                .iter()
                .map(|(room_id, capacity)| RoomRequest {
                    room_id: *room_id,
                    capacity: *capacity,
                })
                .collect(),
        }
    }

    #[test]
    fn test_two_night_per_night_booking_total() {
        let s = setup();
        let room = fixtures::seed_room(&s.db.lock().unwrap(), 500_000, PriceType::PerNight, 2);

        let booking = s
            .workflow
            .create_guest_booking(&request(&[(room.id, 2)], "2024-06-01", "2024-06-03", 2))
            .unwrap();

        assert_eq!(booking.total_amount, 1_000_000);
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.user_id, None);
        assert_eq!(booking.rooms.len(), 1);
        assert!(!s.ledger.is_range_free(room.id, d("2024-06-01"), d("2024-06-03")).unwrap());

        let stored = s.workflow.get_booking_detail(&booking.id).unwrap();
        assert_eq!(stored.booking.total_amount, 1_000_000);
        assert_eq!(stored.booking.rooms, booking.rooms);
        assert_eq!(stored.paid_amount, 0);
    }

    #[test]
    fn test_per_night_total_uses_overrides() {
        let s = setup();
        let room = fixtures::seed_room(&s.db.lock().unwrap(), 500_000, PriceType::PerNight, 2);
        s.ledger
            .set_override(room.id, d("2024-06-02"), AvailabilityStatus::Available, Some(700_000), false)
            .unwrap();

        let booking = s
            .workflow
            .create_guest_booking(&request(&[(room.id, 2)], "2024-06-01", "2024-06-03", 2))
            .unwrap();
        assert_eq!(booking.total_amount, 1_200_000);
    }

    #[test]
    fn test_per_person_total() {
        let s = setup();
        let room = fixtures::seed_room(&s.db.lock().unwrap(), 200_000, PriceType::PerPerson, 4);

        let booking = s
            .workflow
            .create_guest_booking(&request(&[(room.id, 3)], "2024-06-01", "2024-06-04", 3))
            .unwrap();
        assert_eq!(booking.total_amount, 600_000);
    }

    #[test]
    fn test_total_overflow_is_rejected_and_released() {
        let s = setup();
        let (nightly, per_person) = {
            let conn = s.db.lock().unwrap();
            let host = fixtures::seed_user(&conn, Role::Host);
            let homestay = fixtures::seed_homestay(&conn, host);
            (
                fixtures::seed_room_in(&conn, homestay, i64::MAX / 2 + 1, PriceType::PerNight, 2),
                fixtures::seed_room_in(&conn, homestay, i64::MAX / 2, PriceType::PerPerson, 4),
            )
        };

        let err = s
            .workflow
            .create_guest_booking(&request(&[(nightly.id, 2)], "2024-06-01", "2024-06-03", 2))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("out of range")));
        assert!(s.ledger.is_range_free(nightly.id, d("2024-06-01"), d("2024-06-03")).unwrap());

        let err = s
            .workflow
            .create_guest_booking(&request(&[(per_person.id, 3)], "2024-06-01", "2024-06-02", 3))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(s.ledger.is_range_free(per_person.id, d("2024-06-01"), d("2024-06-02")).unwrap());

        let page = s
            .workflow
            .filter_bookings(&BookingFilter::default(), None, Pagination::default())
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[test]
    fn test_same_day_check_out_rejected_before_ledger() {
        let s = setup();
        let room = fixtures::seed_room(&s.db.lock().unwrap(), 500_000, PriceType::PerNight, 2);

        let err = s
            .workflow
            .create_guest_booking(&request(&[(room.id, 2)], "2024-06-01", "2024-06-01", 1))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(s.ledger.calendar(room.id, d("2024-06-01"), d("2024-06-02")).unwrap().is_empty());
    }

    #[test]
    fn test_request_validation() {
        let s = setup();
        let room = fixtures::seed_room(&s.db.lock().unwrap(), 500_000, PriceType::PerNight, 2);

        let cases = [
            request(&[], "2024-06-01", "2024-06-02", 1),
            request(&[(room.id, 2), (room.id, 2)], "2024-06-01", "2024-06-02", 2),
            request(&[(room.id, 2)], "2024-06-01", "2024-06-02", 0),
            request(&[(room.id, 3)], "2024-06-01", "2024-06-02", 2),
            request(&[(room.id, 1)], "2024-06-01", "2024-06-02", 2),
            request(&[(room.id, 2)], "2024-01-01", "2025-06-01", 2),
        ];
        for req in &cases {
            assert!(matches!(
                s.workflow.create_guest_booking(req),
                Err(AppError::Validation(_))
            ));
        }

        let mut blank_phone = request(&[(room.id, 2)], "2024-06-01", "2024-06-02", 1);
        blank_phone.guest.phone = "  ".to_string();
        assert!(matches!(
            s.workflow.create_guest_booking(&blank_phone),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_rooms_must_share_homestay() {
        let s = setup();
        let (a, b) = {
            let conn = s.db.lock().unwrap();
            (
                fixtures::seed_room(&conn, 500_000, PriceType::PerNight, 2),
                fixtures::seed_room(&conn, 500_000, PriceType::PerNight, 2),
            )
        };
        let err = s
            .workflow
            .create_guest_booking(&request(&[(a.id, 1), (b.id, 1)], "2024-06-01", "2024-06-02", 2))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_unknown_room_is_not_found() {
        let s = setup();
        let err = s
            .workflow
            .create_guest_booking(&request(&[(42, 1)], "2024-06-01", "2024-06-02", 1))
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_multi_room_booking_splits_guests() {
        let s = setup();
        let (a, b) = {
            let conn = s.db.lock().unwrap();
            let host = fixtures::seed_user(&conn, Role::Host);
            let homestay = fixtures::seed_homestay(&conn, host);
            (
                fixtures::seed_room_in(&conn, homestay, 400_000, PriceType::PerNight, 2),
                fixtures::seed_room_in(&conn, homestay, 600_000, PriceType::PerNight, 3),
            )
        };

        let booking = s
            .workflow
            .create_guest_booking(&request(&[(a.id, 2), (b.id, 3)], "2024-06-01", "2024-06-02", 5))
            .unwrap();
        assert_eq!(booking.total_amount, 1_000_000);
        assert_eq!(booking.rooms.len(), 2);
    }

    #[test]
    fn test_partial_reservation_failure_is_rolled_back() {
        let s = setup();
        let (a, b) = {
            let conn = s.db.lock().unwrap();
            let host = fixtures::seed_user(&conn, Role::Host);
            let homestay = fixtures::seed_homestay(&conn, host);
            (
                fixtures::seed_room_in(&conn, homestay, 400_000, PriceType::PerNight, 2),
                fixtures::seed_room_in(&conn, homestay, 600_000, PriceType::PerNight, 2),
            )
        };

        // Room `b` is taken between the free check and the reserve step.
        let ledger = Arc::clone(&s.ledger);
        let booking_id = "someone-else";
        let mut guard = ReservationGuard::new(&ledger, booking_id, d("2024-06-01"), d("2024-06-03"));
        guard.reserve(a.id).unwrap();
        s.ledger.reserve(b.id, d("2024-06-02"), d("2024-06-03"), "other").unwrap();
        assert!(matches!(guard.reserve(b.id), Err(AppError::Conflict(_))));
        drop(guard);

        assert!(s.ledger.is_range_free(a.id, d("2024-06-01"), d("2024-06-03")).unwrap());
        assert!(!s.ledger.is_range_free(b.id, d("2024-06-02"), d("2024-06-03")).unwrap());
    }

    #[test]
    fn test_conflicting_booking_leaves_no_orphans() {
        let s = setup();
        let (a, b) = {
            let conn = s.db.lock().unwrap();
            let host = fixtures::seed_user(&conn, Role::Host);
            let homestay = fixtures::seed_homestay(&conn, host);
            (
                fixtures::seed_room_in(&conn, homestay, 400_000, PriceType::PerNight, 2),
                fixtures::seed_room_in(&conn, homestay, 600_000, PriceType::PerNight, 2),
            )
        };
        s.workflow
            .create_guest_booking(&request(&[(b.id, 2)], "2024-06-02", "2024-06-03", 2))
            .unwrap();

        let err = s
            .workflow
            .create_guest_booking(&request(&[(a.id, 2), (b.id, 2)], "2024-06-01", "2024-06-03", 4))
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m.contains(&format!("room {}", b.id))));
        assert!(s.ledger.calendar(a.id, d("2024-06-01"), d("2024-06-03")).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_bookings_for_same_dates() {
        let s = setup();
        let room = fixtures::seed_room(&s.db.lock().unwrap(), 500_000, PriceType::PerNight, 2);
        let workflow = Arc::new(s.workflow);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let workflow = Arc::clone(&workflow);
                let req = request(&[(room.id, 2)], "2024-06-01", "2024-06-03", 2);
                std::thread::spawn(move || workflow.create_guest_booking(&req))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().any(|r| matches!(r, Err(AppError::Conflict(_)))));

        let winner = results.iter().find_map(|r| r.as_ref().ok()).unwrap();
        let days = s.ledger.calendar(room.id, d("2024-06-01"), d("2024-06-03")).unwrap();
        assert_eq!(days.len(), 2);
        assert!(days
            .iter()
            .all(|day| day.booking_id.as_deref() == Some(winner.id.as_str())));
    }

    #[test]
    fn test_authenticated_booking_records_user() {
        let s = setup();
        let (room, guest) = {
            let conn = s.db.lock().unwrap();
            (
                fixtures::seed_room(&conn, 500_000, PriceType::PerNight, 2),
                fixtures::seed_user(&conn, Role::Guest),
            )
        };
        let actor = Actor { user_id: guest, role: Role::Guest };

        let booking = s
            .workflow
            .create_booking(Some(&actor), &request(&[(room.id, 1)], "2024-06-01", "2024-06-02", 1))
            .unwrap();
        assert_eq!(booking.user_id, Some(guest));

        let unknown = Actor { user_id: guest + 100, role: Role::Guest };
        assert!(matches!(
            s.workflow
                .create_booking(Some(&unknown), &request(&[(room.id, 1)], "2024-06-05", "2024-06-06", 1)),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_filter_bookings() {
        let s = setup();
        let (a, b) = {
            let conn = s.db.lock().unwrap();
            (
                fixtures::seed_room(&conn, 500_000, PriceType::PerNight, 2),
                fixtures::seed_room(&conn, 300_000, PriceType::PerNight, 2),
            )
        };
        s.workflow
            .create_guest_booking(&request(&[(a.id, 2)], "2024-06-01", "2024-06-03", 2))
            .unwrap();
        let mut other = request(&[(b.id, 2)], "2024-07-01", "2024-07-03", 2);
        other.guest.name = "Tran Thi B".to_string();
        s.workflow.create_guest_booking(&other).unwrap();

        let all = s
            .workflow
            .filter_bookings(&BookingFilter::default(), None, Pagination::default())
            .unwrap();
        assert_eq!(all.total, 2);

        let by_room = BookingFilter {
            room_id: Some(b.id),
            ..Default::default()
        };
        let page = s.workflow.filter_bookings(&by_room, None, Pagination::default()).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].customer_name, "Tran Thi B");

        let june = BookingFilter {
            date_from: Some(d("2024-06-01")),
            date_to: Some(d("2024-06-30")),
            customer_name: Some("van".to_string()),
            ..Default::default()
        };
        let page = s.workflow.filter_bookings(&june, None, Pagination::default()).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].rooms[0].room_id, a.id);

        assert!(matches!(
            s.workflow
                .filter_bookings(&BookingFilter::default(), None, Pagination { page: 0, page_size: 10 }),
            Err(AppError::Validation(_))
        ));
    }
}
