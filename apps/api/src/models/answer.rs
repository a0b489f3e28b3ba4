use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A confirmed, persisted answer. Rows are insert-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnswerRow {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub user_id: String,
    /// The prompt that was asked: the main question or its cross-question.
    pub question: String,
    pub reference_answer: String,
    pub user_answer: String,
    pub is_follow_up: bool,
    /// Present only on answers to the final question.
    pub rating: Option<f64>,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
