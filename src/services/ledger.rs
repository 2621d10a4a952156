use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior};

use crate::db::{self, queries};
use crate::errors::{AppError, AppResult};
use crate::models::availability::nights;
use crate::models::{AvailabilityDay, AvailabilityStatus, BulkAvailabilityRequest, Room, MAX_PRICE};

/// Per-room, per-date bookable state. Every mutation runs in a single
/// `BEGIN IMMEDIATE` transaction, so writers touching the same
/// `(room_id, date)` keys are totally ordered by SQLite.
pub struct AvailabilityLedger {
    db: Arc<Mutex<Connection>>,
    max_calendar_days: i64,
}

impl AvailabilityLedger {
    pub fn new(db: Arc<Mutex<Connection>>, max_calendar_days: i64) -> Self {
        Self {
            db,
            max_calendar_days,
        }
    }

    pub fn max_calendar_days(&self) -> i64 {
        self.max_calendar_days
    }

    pub fn is_range_free(
        &self,
        room_id: i64,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> AppResult<bool> {
        validate_range(check_in, check_out)?;
        let conn = db::lock(&self.db)?;
        let taken = queries::availability::find_unavailable_dates(&conn, room_id, check_in, check_out)?;
        Ok(taken.is_empty())
    }

    /// Marks every night of `[check_in, check_out)` as booked by `booking_id`.
    /// Nothing is written unless the whole range is free.
    pub fn reserve(
        &self,
        room_id: i64,
        check_in: NaiveDate,
        check_out: NaiveDate,
        booking_id: &str,
    ) -> AppResult<()> {
        validate_range(check_in, check_out)?;
        let mut conn = db::lock(&self.db)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        reserve_in(&tx, room_id, check_in, check_out, booking_id)?;
        tx.commit()?;

        tracing::debug!(room_id, %check_in, %check_out, booking_id, "range reserved");
        Ok(())
    }

    /// Returns the nights held by `booking_id` to `available`. Idempotent.
    pub fn release(
        &self,
        room_id: i64,
        check_in: NaiveDate,
        check_out: NaiveDate,
        booking_id: &str,
    ) -> AppResult<usize> {
        validate_range(check_in, check_out)?;
        let mut conn = db::lock(&self.db)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let released = release_in(&tx, room_id, check_in, check_out, booking_id)?;
        tx.commit()?;

        tracing::debug!(room_id, %check_in, %check_out, booking_id, released, "range released");
        Ok(released)
    }

    /// Host edit of a single date. `price = None` clears the override.
    pub fn set_override(
        &self,
        room_id: i64,
        date: NaiveDate,
        status: AvailabilityStatus,
        price: Option<i64>,
        force: bool,
    ) -> AppResult<AvailabilityDay> {
        validate_host_write(status, price)?;

        let mut conn = db::lock(&self.db)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(existing) = queries::availability::get_day(&tx, room_id, date)? {
            if existing.status == AvailabilityStatus::Booked && !force {
                return Err(AppError::conflict(format!(
                    "room {room_id} is booked on {date}"
                )));
            }
            if existing.status == AvailabilityStatus::Booked {
                tracing::warn!(
                    room_id,
                    %date,
                    booking_id = existing.booking_id.as_deref().unwrap_or_default(),
                    "forced override of a booked date"
                );
            }
        }
        queries::availability::upsert_day(&tx, room_id, date, status, price)?;
        tx.commit()?;

        Ok(AvailabilityDay {
            room_id,
            date,
            status,
            price_override: price,
            booking_id: None,
        })
    }

    /// Applies one host edit to every date of the closed range
    /// `[start_date, end_date]` minus `exclude_dates`. All or nothing:
    /// if any date is refused, no date is written.
    pub fn bulk_set_range(&self, room_id: i64, req: &BulkAvailabilityRequest) -> AppResult<usize> {
        if req.start_date > req.end_date {
            return Err(AppError::validation("start_date must not be after end_date"));
        }
        let span = (req.end_date - req.start_date).num_days() + 1;
        if span > self.max_calendar_days {
            return Err(AppError::validation(format!(
                "range of {span} days exceeds the limit of {} days",
                self.max_calendar_days
            )));
        }
        validate_host_write(req.status, req.price)?;

        let excluded: HashSet<NaiveDate> = req.exclude_dates.iter().copied().collect();
        let targets: Vec<NaiveDate> = req
            .start_date
            .iter_days()
            .take_while(|d| *d <= req.end_date)
            .filter(|d| !excluded.contains(d))
            .collect();

        let mut conn = db::lock(&self.db)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !req.force {
            let mut refused = vec![];
            for date in &targets {
                if let Some(day) = queries::availability::get_day(&tx, room_id, *date)? {
                    if day.status == AvailabilityStatus::Booked {
                        refused.push(date.to_string());
                    }
                }
            }
            if !refused.is_empty() {
                return Err(AppError::conflict(format!(
                    "room {room_id} is booked on {}",
                    refused.join(", ")
                )));
            }
        }

        for date in &targets {
            queries::availability::upsert_day(&tx, room_id, *date, req.status, req.price)?;
        }
        tx.commit()?;

        tracing::info!(
            room_id,
            start = %req.start_date,
            end = %req.end_date,
            written = targets.len(),
            "bulk availability update"
        );
        Ok(targets.len())
    }

    /// Explicit records in `[start, end)`. Dates missing from the result are
    /// available at the base price.
    pub fn calendar(
        &self,
        room_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<AvailabilityDay>> {
        validate_range(start, end)?;
        if (end - start).num_days() > self.max_calendar_days {
            return Err(AppError::validation(format!(
                "calendar window exceeds the limit of {} days",
                self.max_calendar_days
            )));
        }
        let conn = db::lock(&self.db)?;
        Ok(queries::availability::get_days_in_range(&conn, room_id, start, end)?)
    }

    pub fn nightly_prices(
        &self,
        room: &Room,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> AppResult<Vec<(NaiveDate, i64)>> {
        validate_range(check_in, check_out)?;
        let conn = db::lock(&self.db)?;
        nightly_prices_in(&conn, room, check_in, check_out)
    }
}

pub(crate) fn reserve_in(
    conn: &Connection,
    room_id: i64,
    check_in: NaiveDate,
    check_out: NaiveDate,
    booking_id: &str,
) -> AppResult<()> {
    let taken = queries::availability::find_unavailable_dates(conn, room_id, check_in, check_out)?;
    if !taken.is_empty() {
        return Err(AppError::conflict(format!(
            "room {room_id} is unavailable on {}",
            join_dates(&taken)
        )));
    }

    for date in nights(check_in, check_out) {
        if !queries::availability::mark_booked(conn, room_id, date, booking_id)? {
            return Err(AppError::conflict(format!(
                "room {room_id} was taken on {date}"
            )));
        }
    }
    Ok(())
}

pub(crate) fn release_in(
    conn: &Connection,
    room_id: i64,
    check_in: NaiveDate,
    check_out: NaiveDate,
    booking_id: &str,
) -> AppResult<usize> {
    Ok(queries::availability::release_booked(
        conn, room_id, check_in, check_out, booking_id,
    )?)
}

pub(crate) fn nightly_prices_in(
    conn: &Connection,
    room: &Room,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> AppResult<Vec<(NaiveDate, i64)>> {
    let days = queries::availability::get_days_in_range(conn, room.id, check_in, check_out)?;
    let mut overrides = days
        .into_iter()
        .filter_map(|day| day.price_override.map(|p| (day.date, p)))
        .peekable();

    let mut prices = vec![];
    for date in nights(check_in, check_out) {
        let price = match overrides.peek() {
            Some((d, p)) if *d == date => {
                let p = *p;
                overrides.next();
                p
            }
            _ => room.price,
        };
        prices.push((date, price));
    }
    Ok(prices)
}

fn validate_range(start: NaiveDate, end: NaiveDate) -> AppResult<()> {
    if start >= end {
        return Err(AppError::validation(format!(
            "start date {start} must be before end date {end}"
        )));
    }
    Ok(())
}

fn validate_host_write(status: AvailabilityStatus, price: Option<i64>) -> AppResult<()> {
    if status == AvailabilityStatus::Booked {
        return Err(AppError::validation(
            "status 'booked' is set only by reservations",
        ));
    }
    if matches!(price, Some(p) if !(0..=MAX_PRICE).contains(&p)) {
        return Err(AppError::validation(format!(
            "price must be between 0 and {MAX_PRICE}"
        )));
    }
    Ok(())
}

fn join_dates(dates: &[NaiveDate]) -> String {
    dates
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
