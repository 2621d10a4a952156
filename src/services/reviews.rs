use rusqlite::Connection;
use serde::Serialize;

use crate::db::{queries, required};
use crate::errors::{AppError, AppResult};
use crate::models::{Actor, Capability, CreateReviewRequest, Page, Pagination, Review, ReviewSummary};
use crate::services::access;

#[derive(Debug, Serialize)]
pub struct HomestayReviews {
    #[serde(flatten)]
    pub page: Page<Review>,
    pub summary: ReviewSummary,
}

pub fn create_review(
    conn: &Connection,
    actor: &Actor,
    homestay_id: i64,
    req: &CreateReviewRequest,
) -> AppResult<Review> {
    access::require(actor, Capability::WriteReview)?;
    if !(1..=5).contains(&req.rating) {
        return Err(AppError::validation("rating must be between 1 and 5"));
    }
    required(queries::homestays::get_homestay(conn, homestay_id)?, || {
        format!("homestay {homestay_id}")
    })?;

    if let Some(booking_id) = &req.booking_id {
        let booking = required(queries::bookings::get_booking(conn, booking_id)?, || {
            format!("booking {booking_id}")
        })?;
        if booking.homestay_id != homestay_id {
            return Err(AppError::validation(format!(
                "booking {booking_id} is not for homestay {homestay_id}"
            )));
        }
        if booking.user_id != Some(actor.user_id) {
            return Err(AppError::PermissionDenied(
                "booking belongs to another guest".to_string(),
            ));
        }
    }

    Ok(queries::reviews::create_review(conn, actor.user_id, homestay_id, req)?)
}

pub fn list_reviews(
    conn: &Connection,
    homestay_id: i64,
    pagination: Pagination,
) -> AppResult<HomestayReviews> {
    let pagination = pagination.validated()?;
    required(queries::homestays::get_homestay(conn, homestay_id)?, || {
        format!("homestay {homestay_id}")
    })?;

    let (items, total) = queries::reviews::get_reviews_for_homestay(conn, homestay_id, pagination)?;
    let summary = queries::reviews::get_review_summary(conn, homestay_id)?;
    Ok(HomestayReviews {
        page: Page::new(items, total, pagination),
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::Role;
    use crate::services::fixtures;

    fn review(rating: i64) -> CreateReviewRequest {
        CreateReviewRequest {
            booking_id: None,
            rating,
            comment: "Lovely view".to_string(),
        }
    }

    #[test]
    fn test_reviews_and_average() {
        let conn = db::init_db(":memory:").unwrap();
        let host = fixtures::seed_user(&conn, Role::Host);
        let homestay = fixtures::seed_homestay(&conn, host);
        let guest = Actor {
            user_id: fixtures::seed_user(&conn, Role::Guest),
            role: Role::Guest,
        };

        create_review(&conn, &guest, homestay, &review(5)).unwrap();
        create_review(&conn, &guest, homestay, &review(4)).unwrap();

        let reviews = list_reviews(&conn, homestay, Pagination::new(1, 1).unwrap()).unwrap();
        assert_eq!(reviews.page.total, 2);
        assert_eq!(reviews.page.items.len(), 1);
        assert_eq!(reviews.summary.review_count, 2);
        assert_eq!(reviews.summary.average_rating, Some(4.5));
    }

    #[test]
    fn test_rating_bounds_and_roles() {
        let conn = db::init_db(":memory:").unwrap();
        let host_id = fixtures::seed_user(&conn, Role::Host);
        let homestay = fixtures::seed_homestay(&conn, host_id);
        let guest = Actor {
            user_id: fixtures::seed_user(&conn, Role::Guest),
            role: Role::Guest,
        };
        let host = Actor { user_id: host_id, role: Role::Host };

        assert!(matches!(
            create_review(&conn, &guest, homestay, &review(6)),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            create_review(&conn, &guest, homestay, &review(0)),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            create_review(&conn, &host, homestay, &review(5)),
            Err(AppError::PermissionDenied(_))
        ));

        let empty = list_reviews(&conn, homestay, Pagination::default()).unwrap();
        assert_eq!(empty.summary.average_rating, None);
    }
}
