use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::auth::Identity;
use crate::errors::AppError;
use crate::intake::repository::get_interview;
use crate::session::answers::insert_answer;
use crate::session::actions;
use crate::session::attempt::{Attempt, SessionView};
use crate::session::flow::FlowEffect;
use crate::session::recorder::{AnswerPolicy, TranscriptFragment};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SaveAnswerRequest {
    #[serde(default)]
    pub confirm: bool,
}

fn answer_policy(state: &AppState) -> AnswerPolicy {
    AnswerPolicy {
        min_duration: Duration::from_secs(state.config.min_recording_secs),
        min_chars: state.config.min_answer_chars,
    }
}

/// Runs one synchronous transition on the caller's session.
async fn act<F>(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    transition: F,
) -> Result<Json<SessionView>, AppError>
where
    F: FnOnce(&mut Attempt) -> Result<Vec<FlowEffect>, AppError>,
{
    let shared = state.sessions.get(id, &identity.user_id).await?;
    let mut attempt = shared.lock().await;
    let effects = transition(&mut *attempt)?;
    Ok(Json(attempt.view(Instant::now(), effects)))
}

/// POST /api/v1/interviews/:id/sessions
pub async fn handle_start_session(
    State(state): State<AppState>,
    identity: Identity,
    Path(interview_id): Path<Uuid>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let interview = get_interview(&state.db, interview_id, &identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Interview {interview_id} not found")))?;

    let (attempt, effects) = Attempt::start(&interview, answer_policy(&state))?;
    let view = attempt.view(Instant::now(), effects);
    state.sessions.insert(attempt).await;

    info!(
        "Started session {} for interview {interview_id} ({} active)",
        view.session_id,
        state.sessions.len().await
    );
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    act(&state, &identity, id, |_| Ok(Vec::new())).await
}

/// POST /api/v1/sessions/:id/speech/ended
pub async fn handle_speech_ended(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    act(&state, &identity, id, Attempt::speech_ended).await
}

/// POST /api/v1/sessions/:id/speech/stop
pub async fn handle_stop_speaking(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    act(&state, &identity, id, Attempt::stop_speaking).await
}

/// POST /api/v1/sessions/:id/speech/replay
pub async fn handle_replay(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    act(&state, &identity, id, Attempt::replay).await
}

/// POST /api/v1/sessions/:id/transcript
pub async fn handle_transcript(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(fragment): Json<TranscriptFragment>,
) -> Result<Json<SessionView>, AppError> {
    act(&state, &identity, id, |attempt| {
        attempt.push_transcript(fragment);
        Ok(Vec::new())
    })
    .await
}

/// POST /api/v1/sessions/:id/recording
///
/// Stopping a valid take on the final question runs the overall evaluation
/// before responding; it never fails the request.
pub async fn handle_toggle_recording(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let shared = state.sessions.get(id, &identity.user_id).await?;
    let view = actions::toggle_recording(&shared, state.llm.clone()).await?;
    Ok(Json(view))
}

/// POST /api/v1/sessions/:id/answer
///
/// Stores the confirmed answer and moves the flow on, then holds the
/// response for the advance delay. A failed write changes nothing, so the
/// user can retry.
pub async fn handle_save_answer(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(req): Json<SaveAnswerRequest>,
) -> Result<Json<SessionView>, AppError> {
    let shared = state.sessions.get(id, &identity.user_id).await?;
    let db = state.db.clone();
    let view = actions::save_answer(
        &state.sessions,
        shared,
        req.confirm,
        state.config.advance_delay,
        move |answer| async move {
            insert_answer(&db, &answer)
                .await
                .map(|_| ())
                .map_err(AppError::from)
        },
    )
    .await?;

    if view.finished {
        info!("Session {id} finished; feedback handed off");
    }
    Ok(Json(view))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_teardown_session(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let shared = state.sessions.get(id, &identity.user_id).await?;
    let view = {
        let mut attempt = shared.lock().await;
        let effects = attempt.teardown();
        attempt.view(Instant::now(), effects)
    };
    state.sessions.remove(id).await;
    info!("Session {id} torn down");
    Ok(Json(view))
}
