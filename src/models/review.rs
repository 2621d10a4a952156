use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub homestay_id: i64,
    pub booking_id: Option<String>,
    pub rating: i64,
    pub comment: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReviewRequest {
    pub booking_id: Option<String>,
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewSummary {
    pub average_rating: Option<f64>,
    pub review_count: i64,
}
