use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// One generated interview question with the model's reference answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewRow {
    pub id: Uuid,
    pub user_id: String,
    pub position: String,
    pub description: String,
    pub experience: i32,
    pub tech_stack: String,
    pub resume_url: Option<String>,
    pub questions: Json<Vec<QuestionAnswer>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
