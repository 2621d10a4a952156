use rusqlite::Connection;

use crate::db::{queries, required};
use crate::errors::{AppError, AppResult};
use crate::db::queries::homestays::StatsScope;
use crate::models::{
    Actor, Capability, CreateHomestayRequest, Homestay, HomestayFilter, HomestayStats, Page,
    Pagination, UpdateHomestayRequest,
};
use crate::services::access;

pub fn create_homestay(
    conn: &Connection,
    actor: &Actor,
    req: &CreateHomestayRequest,
) -> AppResult<Homestay> {
    access::require(actor, Capability::ManageProperty)?;
    for (field, value) in [
        ("name", &req.name),
        ("address", &req.address),
        ("city", &req.city),
        ("district", &req.district),
        ("ward", &req.ward),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::validation(format!("{field} is required")));
        }
    }
    validate_coordinates(req.latitude, req.longitude)?;

    let id = queries::homestays::create_homestay(conn, actor.user_id, req)?;
    tracing::info!(homestay_id = id, owner_id = actor.user_id, "homestay created");
    get_homestay(conn, id)
}

pub fn get_homestay(conn: &Connection, id: i64) -> AppResult<Homestay> {
    required(queries::homestays::get_homestay(conn, id)?, || format!("homestay {id}"))
}

pub fn update_homestay(
    conn: &Connection,
    actor: &Actor,
    id: i64,
    req: &UpdateHomestayRequest,
) -> AppResult<Homestay> {
    let mut homestay = access::owned_homestay(conn, actor, id, Capability::ManageProperty)?;

    if let Some(name) = &req.name {
        if name.trim().is_empty() {
            return Err(AppError::validation("name must not be empty"));
        }
        homestay.name = name.clone();
    }
    if let Some(description) = &req.description {
        homestay.description = description.clone();
    }
    if let Some(address) = &req.address {
        homestay.address = address.clone();
    }
    if let Some(city) = &req.city {
        homestay.city = city.clone();
    }
    if let Some(district) = &req.district {
        homestay.district = district.clone();
    }
    if let Some(ward) = &req.ward {
        homestay.ward = ward.clone();
    }
    homestay.latitude = req.latitude.unwrap_or(homestay.latitude);
    homestay.longitude = req.longitude.unwrap_or(homestay.longitude);
    validate_coordinates(homestay.latitude, homestay.longitude)?;
    if let Some(status) = req.status {
        homestay.status = status;
    }

    queries::homestays::update_homestay(conn, &homestay)?;
    get_homestay(conn, id)
}

/// Refused once any booking exists for the homestay; bookings are never
/// deleted, so the homestay must be deactivated instead.
pub fn delete_homestay(conn: &Connection, actor: &Actor, id: i64) -> AppResult<()> {
    access::owned_homestay(conn, actor, id, Capability::ManageProperty)?;
    if queries::homestays::has_bookings(conn, id)? {
        return Err(AppError::conflict(format!(
            "homestay {id} has bookings; set its status to inactive instead"
        )));
    }

    let tx = conn.unchecked_transaction()?;
    queries::homestays::delete_homestay_cascade(&tx, id)?;
    tx.commit()?;

    tracing::info!(homestay_id = id, "homestay deleted");
    Ok(())
}

pub fn search_homestays(
    conn: &Connection,
    filter: &HomestayFilter,
    pagination: Pagination,
) -> AppResult<Page<Homestay>> {
    let pagination = pagination.validated()?;
    let (items, total) = queries::homestays::search_homestays(conn, filter, pagination)?;
    Ok(Page::new(items, total, pagination))
}

/// Totals across every homestay the actor owns.
pub fn host_stats(conn: &Connection, actor: &Actor) -> AppResult<HomestayStats> {
    access::require(actor, Capability::ManageProperty)?;
    Ok(queries::homestays::get_stats(conn, StatsScope::Owner(actor.user_id))?)
}

pub fn homestay_stats(conn: &Connection, actor: &Actor, id: i64) -> AppResult<HomestayStats> {
    access::owned_homestay(conn, actor, id, Capability::ManageProperty)?;
    Ok(queries::homestays::get_stats(conn, StatsScope::Homestay(id))?)
}

fn validate_coordinates(latitude: f64, longitude: f64) -> AppResult<()> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::validation("coordinates out of range"));
    }
    Ok(())
}
