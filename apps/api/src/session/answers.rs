//! Answer persistence. Rows are insert-only and scoped to the owning user.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::answer::AnswerRow;

/// An answer ready to be written once the user confirms it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnswer {
    pub interview_id: Uuid,
    pub user_id: String,
    pub question: String,
    pub reference_answer: String,
    pub user_answer: String,
    pub is_follow_up: bool,
    pub rating: Option<f64>,
    pub feedback: Option<String>,
}

pub async fn insert_answer(pool: &PgPool, answer: &NewAnswer) -> Result<AnswerRow, sqlx::Error> {
    let row = sqlx::query_as::<_, AnswerRow>(
        r#"
        INSERT INTO answers
            (id, interview_id, user_id, question, reference_answer, user_answer,
             is_follow_up, rating, feedback)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(answer.interview_id)
    .bind(&answer.user_id)
    .bind(&answer.question)
    .bind(&answer.reference_answer)
    .bind(&answer.user_answer)
    .bind(answer.is_follow_up)
    .bind(answer.rating)
    .bind(&answer.feedback)
    .fetch_one(pool)
    .await?;

    info!(
        "Saved answer {} for interview {} (follow-up: {})",
        row.id, row.interview_id, row.is_follow_up
    );
    Ok(row)
}

/// Oldest first, the order they were given in.
pub async fn list_answers(
    pool: &PgPool,
    interview_id: Uuid,
    user_id: &str,
) -> Result<Vec<AnswerRow>, sqlx::Error> {
    sqlx::query_as::<_, AnswerRow>(
        "SELECT * FROM answers WHERE interview_id = $1 AND user_id = $2 ORDER BY created_at ASC",
    )
    .bind(interview_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
}
