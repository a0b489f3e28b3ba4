use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Identity;
use crate::errors::AppError;
use crate::intake::form::{parse_experience, InterviewForm};
use crate::intake::generator::generate_questions;
use crate::intake::repository::{
    delete_interview, get_interview, insert_interview, list_interviews, update_interview,
};
use crate::intake::resume::{extract_resume_text, ResumeFile};
use crate::intake::storage::ObjectStore;
use crate::models::answer::AnswerRow;
use crate::models::interview::{InterviewRow, QuestionAnswer};
use crate::session::answers::list_answers;
use crate::state::AppState;

/// Multipart field carrying the résumé file.
pub const RESUME_FIELD: &str = "resume";

/// A parsed intake submission.
#[derive(Debug, Clone)]
pub struct IntakeSubmission {
    pub form: InterviewForm,
    pub resume: Option<ResumeFile>,
}

/// Accumulates multipart fields in whatever order they arrive.
#[derive(Debug, Default)]
pub struct IntakeFields {
    position: Option<String>,
    description: Option<String>,
    experience: Option<String>,
    tech_stack: Option<String>,
    resume: Option<ResumeFile>,
}

impl IntakeFields {
    /// Records a text field. Unknown names are ignored.
    pub fn set_text(&mut self, name: &str, value: String) {
        match name {
            "position" => self.position = Some(value),
            "description" => self.description = Some(value),
            "experience" => self.experience = Some(value),
            "tech_stack" => self.tech_stack = Some(value),
            other => warn!("Ignoring unknown intake field '{other}'"),
        }
    }

    /// An empty file input counts as no résumé.
    pub fn set_resume(&mut self, file: ResumeFile) {
        if file.bytes.is_empty() {
            return;
        }
        self.resume = Some(file);
    }

    /// Validated, trimmed submission.
    pub fn finish(self) -> Result<IntakeSubmission, AppError> {
        let experience = match self.experience.as_deref() {
            Some(raw) => parse_experience(raw)?,
            None => {
                return Err(AppError::Validation(
                    "Years of experience is required".to_string(),
                ))
            }
        };
        let form = InterviewForm {
            position: self.position.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            experience,
            tech_stack: self.tech_stack.unwrap_or_default(),
        }
        .trimmed();
        form.validate()?;

        Ok(IntakeSubmission {
            form,
            resume: self.resume,
        })
    }
}

async fn read_submission(mut multipart: Multipart) -> Result<IntakeSubmission, AppError> {
    let mut fields = IntakeFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed form data: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == RESUME_FIELD {
            let file_name = field.file_name().unwrap_or("resume").to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Could not read résumé upload: {e}")))?;
            fields.set_resume(ResumeFile {
                file_name,
                content_type,
                bytes,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Could not read field '{name}': {e}")))?;
            fields.set_text(&name, value);
        }
    }

    fields.finish()
}

/// Uploads the résumé when present and extracts its text. Upload comes first;
/// a stored file is not removed if a later step fails.
async fn prepare_resume(
    state: &AppState,
    resume: Option<&ResumeFile>,
) -> Result<(Option<String>, Option<String>), AppError> {
    let Some(file) = resume else {
        return Ok((None, None));
    };
    let url = state
        .storage
        .upload(&state.config.resume_upload_preset, file)
        .await?;
    let text = extract_resume_text(file).await?;
    Ok((Some(url), text))
}

/// Text of a résumé stored by an earlier submission. Any failure only costs
/// the résumé context, never the request.
async fn stored_resume_text(storage: &dyn ObjectStore, url: &str) -> Option<String> {
    let file = match storage.download(url).await {
        Ok(Some(file)) => file,
        Ok(None) => {
            warn!("Stored résumé {url} is no longer available");
            return None;
        }
        Err(e) => {
            warn!("Could not fetch stored résumé {url}: {e}");
            return None;
        }
    };
    match extract_resume_text(&file).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Ignoring stored résumé {url}: {e}");
            None
        }
    }
}

async fn questions_for(
    state: &AppState,
    form: &InterviewForm,
    resume_text: Option<&str>,
) -> Result<Vec<QuestionAnswer>, AppError> {
    generate_questions(
        state.llm.as_ref(),
        form,
        resume_text,
        state.config.question_count,
        &state.retry,
    )
    .await
}

/// POST /api/v1/interviews
pub async fn handle_create_interview(
    State(state): State<AppState>,
    identity: Identity,
    multipart: Multipart,
) -> Result<(StatusCode, Json<InterviewRow>), AppError> {
    let submission = read_submission(multipart).await?;
    let (resume_url, resume_text) = prepare_resume(&state, submission.resume.as_ref()).await?;
    let questions = questions_for(&state, &submission.form, resume_text.as_deref()).await?;

    let row = insert_interview(
        &state.db,
        &identity.user_id,
        &submission.form,
        resume_url.as_deref(),
        &questions,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(row)))
}

/// PUT /api/v1/interviews/:id
///
/// Regenerates the questions. Without a new file the previous résumé is kept
/// and its text is read back so the questions stay tailored to it.
pub async fn handle_update_interview(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<InterviewRow>, AppError> {
    let submission = read_submission(multipart).await?;
    let existing = get_interview(&state.db, id, &identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Interview {id} not found")))?;

    let (new_url, new_text) = prepare_resume(&state, submission.resume.as_ref()).await?;
    let (resume_url, resume_text) = match (new_url, existing.resume_url) {
        (Some(url), _) => (Some(url), new_text),
        (None, Some(stored)) => {
            let text = stored_resume_text(state.storage.as_ref(), &stored).await;
            (Some(stored), text)
        }
        (None, None) => (None, None),
    };
    let questions = questions_for(&state, &submission.form, resume_text.as_deref()).await?;

    let row = update_interview(
        &state.db,
        id,
        &identity.user_id,
        &submission.form,
        resume_url.as_deref(),
        &questions,
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Interview {id} not found")))?;

    Ok(Json(row))
}

/// GET /api/v1/interviews
pub async fn handle_list_interviews(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<InterviewRow>>, AppError> {
    Ok(Json(list_interviews(&state.db, &identity.user_id).await?))
}

/// GET /api/v1/interviews/:id
pub async fn handle_get_interview(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<InterviewRow>, AppError> {
    let row = get_interview(&state.db, id, &identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Interview {id} not found")))?;
    Ok(Json(row))
}

/// DELETE /api/v1/interviews/:id
pub async fn handle_delete_interview(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !delete_interview(&state.db, id, &identity.user_id).await? {
        return Err(AppError::NotFound(format!("Interview {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct OverallFeedback {
    pub rating: f64,
    pub feedback: String,
}

#[derive(Debug, Serialize)]
pub struct AnswersResponse {
    pub interview_id: Uuid,
    pub answers: Vec<AnswerRow>,
    pub overall: Option<OverallFeedback>,
}

/// Latest rated answer wins; only final-question answers carry a rating.
pub fn overall_from(answers: &[AnswerRow]) -> Option<OverallFeedback> {
    answers.iter().rev().find_map(|a| {
        Some(OverallFeedback {
            rating: a.rating?,
            feedback: a.feedback.clone().unwrap_or_default(),
        })
    })
}

/// GET /api/v1/interviews/:id/answers
pub async fn handle_list_answers(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<AnswersResponse>, AppError> {
    get_interview(&state.db, id, &identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Interview {id} not found")))?;

    let answers = list_answers(&state.db, id, &identity.user_id).await?;
    info!("Loaded {} answers for interview {id}", answers.len());
    let overall = overall_from(&answers);

    Ok(Json(AnswersResponse {
        interview_id: id,
        answers,
        overall,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::Utc;

    use super::*;

    /// Serves one canned download and remembers which URLs were asked for.
    struct StoredResume {
        reply: Result<Option<ResumeFile>, AppError>,
        requested: Mutex<Vec<String>>,
    }

    impl StoredResume {
        fn new(reply: Result<Option<ResumeFile>, AppError>) -> Self {
            Self {
                reply,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ObjectStore for StoredResume {
        async fn upload(&self, _preset: &str, _file: &ResumeFile) -> Result<String, AppError> {
            Err(AppError::S3("read-only".to_string()))
        }

        async fn download(&self, url: &str) -> Result<Option<ResumeFile>, AppError> {
            self.requested.lock().unwrap().push(url.to_string());
            match &self.reply {
                Ok(file) => Ok(file.clone()),
                Err(_) => Err(AppError::S3("bucket unreachable".to_string())),
            }
        }
    }

    const STORED_URL: &str = "http://localhost:9000/mockprep/resumes/cv.pdf";

    fn stored_file(name: &str, content_type: &str, bytes: &'static [u8]) -> ResumeFile {
        ResumeFile {
            file_name: name.to_string(),
            content_type: Some(content_type.to_string()),
            bytes: Bytes::from_static(bytes),
        }
    }

    fn filled() -> IntakeFields {
        let mut fields = IntakeFields::default();
        fields.set_text("position", "  Backend Engineer ".to_string());
        fields.set_text("description", "Own the payments ledger service".to_string());
        fields.set_text("experience", "3".to_string());
        fields.set_text("tech_stack", "Rust, Postgres, Kafka".to_string());
        fields
    }

    fn answer(rating: Option<f64>, feedback: Option<&str>) -> AnswerRow {
        AnswerRow {
            id: Uuid::new_v4(),
            interview_id: Uuid::nil(),
            user_id: "user_1".to_string(),
            question: "Q?".to_string(),
            reference_answer: "R".to_string(),
            user_answer: "A".to_string(),
            is_follow_up: false,
            rating,
            feedback: feedback.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_fields_build_trimmed_form() {
        let submission = filled().finish().unwrap();
        assert_eq!(submission.form.position, "Backend Engineer");
        assert_eq!(submission.form.experience, 3);
        assert!(submission.resume.is_none());
    }

    #[test]
    fn test_missing_experience_is_rejected() {
        let mut fields = IntakeFields::default();
        fields.set_text("position", "SRE".to_string());
        fields.set_text("description", "Keep production healthy".to_string());
        fields.set_text("tech_stack", "Linux".to_string());
        assert!(matches!(fields.finish(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_short_description_is_rejected() {
        let mut fields = filled();
        fields.set_text("description", "   too short   ".to_string());
        assert!(matches!(fields.finish(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_negative_experience_is_rejected() {
        let mut fields = filled();
        fields.set_text("experience", "-1".to_string());
        assert!(matches!(fields.finish(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_empty_file_input_means_no_resume() {
        let mut fields = filled();
        fields.set_resume(ResumeFile {
            file_name: "cv.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            bytes: Bytes::new(),
        });
        assert!(fields.finish().unwrap().resume.is_none());
    }

    #[test]
    fn test_overall_comes_from_rated_answers() {
        assert!(overall_from(&[answer(None, None)]).is_none());

        let overall = overall_from(&[
            answer(None, None),
            answer(Some(6.0), Some("Earlier")),
            answer(Some(8.0), Some("Final")),
            answer(None, None),
        ])
        .unwrap();
        assert_eq!(overall.rating, 8.0);
        assert_eq!(overall.feedback, "Final");
    }

    #[tokio::test]
    async fn test_stored_resume_is_fetched_by_its_url() {
        let store = StoredResume::new(Ok(Some(stored_file(
            "cv.txt",
            "text/plain",
            b"Rust and Postgres",
        ))));

        assert_eq!(stored_resume_text(&store, STORED_URL).await, None);
        assert_eq!(*store.requested.lock().unwrap(), vec![STORED_URL.to_string()]);
    }

    #[tokio::test]
    async fn test_stored_resume_failures_only_drop_context() {
        let unreachable = StoredResume::new(Err(AppError::S3("down".to_string())));
        assert_eq!(stored_resume_text(&unreachable, STORED_URL).await, None);

        let missing = StoredResume::new(Ok(None));
        assert_eq!(stored_resume_text(&missing, STORED_URL).await, None);

        let corrupt = StoredResume::new(Ok(Some(stored_file(
            "cv.pdf",
            "application/pdf",
            b"%PDF-1.4 truncated",
        ))));
        assert_eq!(stored_resume_text(&corrupt, STORED_URL).await, None);
    }
}
