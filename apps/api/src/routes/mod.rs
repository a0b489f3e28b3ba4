pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::intake::handlers as intake;
use crate::session::handlers as session;
use crate::state::AppState;

/// Résumé uploads travel inside the intake form.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Intake
        .route(
            "/api/v1/interviews",
            get(intake::handle_list_interviews).post(intake::handle_create_interview),
        )
        .route(
            "/api/v1/interviews/:id",
            get(intake::handle_get_interview)
                .put(intake::handle_update_interview)
                .delete(intake::handle_delete_interview),
        )
        .route(
            "/api/v1/interviews/:id/answers",
            get(intake::handle_list_answers),
        )
        // Interview sessions
        .route(
            "/api/v1/interviews/:id/sessions",
            post(session::handle_start_session),
        )
        .route(
            "/api/v1/sessions/:id",
            get(session::handle_get_session).delete(session::handle_teardown_session),
        )
        .route(
            "/api/v1/sessions/:id/speech/ended",
            post(session::handle_speech_ended),
        )
        .route(
            "/api/v1/sessions/:id/speech/stop",
            post(session::handle_stop_speaking),
        )
        .route(
            "/api/v1/sessions/:id/speech/replay",
            post(session::handle_replay),
        )
        .route(
            "/api/v1/sessions/:id/transcript",
            post(session::handle_transcript),
        )
        .route(
            "/api/v1/sessions/:id/recording",
            post(session::handle_toggle_recording),
        )
        .route(
            "/api/v1/sessions/:id/answer",
            post(session::handle_save_answer),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
