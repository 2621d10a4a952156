use rusqlite::{params, Connection};

use crate::db::{now_timestamp, parse_timestamp};
use crate::models::{CreateReviewRequest, Pagination, Review, ReviewSummary};

pub fn create_review(
    conn: &Connection,
    user_id: i64,
    homestay_id: i64,
    req: &CreateReviewRequest,
) -> anyhow::Result<Review> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO reviews (user_id, homestay_id, booking_id, rating, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![user_id, homestay_id, req.booking_id, req.rating, req.comment, now],
    )?;

    Ok(Review {
        id: conn.last_insert_rowid(),
        user_id,
        homestay_id,
        booking_id: req.booking_id.clone(),
        rating: req.rating,
        comment: req.comment.clone(),
        created_at: parse_timestamp(&now)?,
    })
}

pub fn get_reviews_for_homestay(
    conn: &Connection,
    homestay_id: i64,
    pagination: Pagination,
) -> anyhow::Result<(Vec<Review>, i64)> {
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM reviews WHERE homestay_id = ?1",
        params![homestay_id],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT id, user_id, homestay_id, booking_id, rating, comment, created_at
         FROM reviews WHERE homestay_id = ?1
         ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3",
    )?;

    let rows = stmt.query_map(
        params![homestay_id, pagination.page_size, pagination.offset()],
        |row| Ok(parse_review_row(row)),
    )?;

    let mut reviews = vec![];
    for row in rows {
        reviews.push(row??);
    }
    Ok((reviews, total))
}

fn parse_review_row(row: &rusqlite::Row) -> anyhow::Result<Review> {
    let created_at: String = row.get(6)?;
    Ok(Review {
        id: row.get(0)?,
        user_id: row.get(1)?,
        homestay_id: row.get(2)?,
        booking_id: row.get(3)?,
        rating: row.get(4)?,
        comment: row.get(5)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

pub fn get_review_summary(conn: &Connection, homestay_id: i64) -> anyhow::Result<ReviewSummary> {
    let summary = conn.query_row(
        "SELECT AVG(rating), COUNT(*) FROM reviews WHERE homestay_id = ?1",
        params![homestay_id],
        |row| {
            Ok(ReviewSummary {
                average_rating: row.get(0)?,
                review_count: row.get(1)?,
            })
        },
    )?;
    Ok(summary)
}
