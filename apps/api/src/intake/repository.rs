//! Interview persistence. Every query is scoped to the owning user.

use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::intake::form::InterviewForm;
use crate::models::interview::{InterviewRow, QuestionAnswer};

pub async fn insert_interview(
    pool: &PgPool,
    user_id: &str,
    form: &InterviewForm,
    resume_url: Option<&str>,
    questions: &[QuestionAnswer],
) -> Result<InterviewRow, sqlx::Error> {
    let row = sqlx::query_as::<_, InterviewRow>(
        r#"
        INSERT INTO interviews
            (id, user_id, position, description, experience, tech_stack, resume_url, questions)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&form.position)
    .bind(&form.description)
    .bind(form.experience)
    .bind(&form.tech_stack)
    .bind(resume_url)
    .bind(Json(questions))
    .fetch_one(pool)
    .await?;

    info!("Created interview {} for user {}", row.id, user_id);
    Ok(row)
}

/// Updates in place. `None` when the interview does not exist for this owner.
pub async fn update_interview(
    pool: &PgPool,
    id: Uuid,
    user_id: &str,
    form: &InterviewForm,
    resume_url: Option<&str>,
    questions: &[QuestionAnswer],
) -> Result<Option<InterviewRow>, sqlx::Error> {
    let row = sqlx::query_as::<_, InterviewRow>(
        r#"
        UPDATE interviews
        SET position = $3, description = $4, experience = $5, tech_stack = $6,
            resume_url = $7, questions = $8, updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(&form.position)
    .bind(&form.description)
    .bind(form.experience)
    .bind(&form.tech_stack)
    .bind(resume_url)
    .bind(Json(questions))
    .fetch_optional(pool)
    .await?;

    if row.is_some() {
        info!("Updated interview {id} for user {user_id}");
    }
    Ok(row)
}

pub async fn get_interview(
    pool: &PgPool,
    id: Uuid,
    user_id: &str,
) -> Result<Option<InterviewRow>, sqlx::Error> {
    sqlx::query_as::<_, InterviewRow>("SELECT * FROM interviews WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_interviews(pool: &PgPool, user_id: &str) -> Result<Vec<InterviewRow>, sqlx::Error> {
    sqlx::query_as::<_, InterviewRow>(
        "SELECT * FROM interviews WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Deletes the interview; its answers go with it (ON DELETE CASCADE).
/// Returns false when nothing matched.
pub async fn delete_interview(pool: &PgPool, id: Uuid, user_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM interviews WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    let deleted = result.rows_affected() > 0;
    if deleted {
        info!("Deleted interview {id} for user {user_id}");
    }
    Ok(deleted)
}
