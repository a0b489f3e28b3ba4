//! Session steps that await a collaborator while changing state.
//!
//! The state change and its collaborator call run as one spawned task, so a
//! request dropped mid-way (client gone) still finishes the step: a stored
//! answer always advances the flow and a started evaluation always lands.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::llm_client::TextGenerator;
use crate::session::answers::NewAnswer;
use crate::session::attempt::{RecordingOutcome, SessionView};
use crate::session::evaluation::{evaluate_overall, OverallResult};
use crate::session::store::{SessionStore, SharedAttempt};

/// Flips the recorder. Stopping a valid take on the final question evaluates
/// the whole attempt before the view is returned.
pub async fn toggle_recording(
    shared: &SharedAttempt,
    llm: Arc<dyn TextGenerator>,
) -> Result<SessionView, AppError> {
    let pending = {
        let mut attempt = shared.lock().await;
        match attempt.toggle_recording(Instant::now())? {
            RecordingOutcome::Stopped {
                answer,
                needs_evaluation: true,
            } => Some((attempt.take(), attempt.evaluation_items(&answer))),
            _ => None,
        }
    };

    if let Some((take, items)) = pending {
        let target = shared.clone();
        let evaluation = tokio::spawn(async move {
            let result = evaluate_overall(llm.as_ref(), &items).await;
            if !target.lock().await.apply_overall(take, result) {
                debug!("Discarded evaluation for superseded take {take}");
            }
        });
        if let Err(e) = evaluation.await {
            warn!("Evaluation task failed, using fallback: {e}");
            shared
                .lock()
                .await
                .apply_overall(take, OverallResult::fallback());
        }
    }

    let attempt = shared.lock().await;
    Ok(attempt.view(Instant::now(), Vec::new()))
}

/// Writes the confirmed answer with `write`, then moves the flow on. The
/// response is held for `advance_delay` so the client sees the next prompt
/// only after the pause. A failed write changes nothing.
pub async fn save_answer<W, Fut>(
    sessions: &SessionStore,
    shared: SharedAttempt,
    confirm: bool,
    advance_delay: Duration,
    write: W,
) -> Result<SessionView, AppError>
where
    W: FnOnce(NewAnswer) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), AppError>> + Send + 'static,
{
    let commit = tokio::spawn(async move {
        let mut attempt = shared.lock().await;
        let new_answer = attempt.prepare_save(confirm)?;
        let answer = new_answer.user_answer.clone();
        write(new_answer).await?;
        let effects = attempt.complete_save(&answer)?;
        Ok::<_, AppError>(attempt.view(Instant::now(), effects))
    });

    let view = commit
        .await
        .map_err(|e| AppError::Internal(anyhow!("Answer save task failed: {e}")))??;

    if view.finished {
        sessions.remove(view.session_id).await;
        debug!("Session {} handed off to feedback", view.session_id);
    }
    tokio::time::sleep(advance_delay).await;
    Ok(view)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    use super::*;
    use crate::llm_client::LlmError;
    use crate::models::interview::{InterviewRow, QuestionAnswer};
    use crate::session::attempt::Attempt;
    use crate::session::flow::FlowEffect;
    use crate::session::recorder::{AnswerPolicy, TranscriptFragment};

    const LONG_ANSWER: &str = "I would put a write-through cache in front of the database";
    const DELAY: Duration = Duration::from_millis(500);

    /// Replies after `latency` with a canned body or an API status.
    struct SlowGenerator {
        latency: Duration,
        reply: Result<&'static str, u16>,
    }

    #[async_trait]
    impl TextGenerator for SlowGenerator {
        async fn generate(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
            tokio::time::sleep(self.latency).await;
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(status) => Err(LlmError::Api {
                    status,
                    message: "overloaded".to_string(),
                }),
            }
        }
    }

    fn llm(reply: Result<&'static str, u16>) -> Arc<dyn TextGenerator> {
        Arc::new(SlowGenerator {
            latency: Duration::from_secs(3),
            reply,
        })
    }

    async fn answering(sessions: &SessionStore, questions: usize) -> SharedAttempt {
        let interview = InterviewRow {
            id: Uuid::new_v4(),
            user_id: "alice".to_string(),
            position: "Backend Engineer".to_string(),
            description: "Own the payments ledger".to_string(),
            experience: 3,
            tech_stack: "Rust, Postgres".to_string(),
            resume_url: None,
            questions: Json(
                (1..=questions)
                    .map(|i| QuestionAnswer {
                        question: format!("Question {i}?"),
                        answer: format!("Reference {i}"),
                    })
                    .collect(),
            ),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let (mut attempt, _) = Attempt::start(&interview, AnswerPolicy::default()).unwrap();
        attempt.speech_ended().unwrap();
        sessions.insert(attempt).await
    }

    async fn start_take(shared: &SharedAttempt, text: &str) {
        let mut attempt = shared.lock().await;
        attempt.toggle_recording(Instant::now()).unwrap();
        attempt.push_transcript(TranscriptFragment {
            text: text.to_string(),
            is_final: true,
        });
    }

    /// Records one valid take, stopped by the caller.
    async fn valid_take(shared: &SharedAttempt) {
        start_take(shared, LONG_ANSWER).await;
        tokio::time::advance(Duration::from_secs(40)).await;
    }

    fn sessions() -> SessionStore {
        SessionStore::new(Duration::from_secs(3600))
    }

    type Written = Arc<StdMutex<Vec<NewAnswer>>>;

    fn recording_writer(
        written: &Written,
    ) -> impl FnOnce(NewAnswer) -> std::future::Ready<Result<(), AppError>> + Send + 'static {
        let written = written.clone();
        move |answer| {
            written.lock().unwrap().push(answer);
            std::future::ready(Ok(()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_stop_applies_fenced_evaluation() {
        let sessions = sessions();
        let shared = answering(&sessions, 1).await;
        valid_take(&shared).await;

        let view = toggle_recording(
            &shared,
            llm(Ok("```json\n{\"ratings\": 7, \"feedback\": \"Clear and structured.\"}\n```")),
        )
        .await
        .unwrap();

        let overall = view.overall.unwrap();
        assert_eq!(overall.ratings, 7.0);
        assert_eq!(overall.feedback, "Clear and structured.");
        assert!(shared.lock().await.prepare_save(true).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_stop_falls_back_when_service_busy() {
        let sessions = sessions();
        let shared = answering(&sessions, 1).await;
        valid_take(&shared).await;

        let view = toggle_recording(&shared, llm(Err(503))).await.unwrap();

        assert_eq!(view.overall, Some(OverallResult::fallback()));
        assert!(shared.lock().await.prepare_save(true).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_earlier_questions_skip_evaluation() {
        let sessions = sessions();
        let shared = answering(&sessions, 2).await;
        valid_take(&shared).await;

        let started = Instant::now();
        let view = toggle_recording(&shared, llm(Ok("{}"))).await.unwrap();

        assert!(view.overall.is_none());
        assert!(view.recorder.answer_ready);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_stop_still_lands_evaluation() {
        let sessions = sessions();
        let shared = answering(&sessions, 1).await;
        valid_take(&shared).await;

        let request = toggle_recording(&shared, llm(Ok(r#"{"ratings": 6, "feedback": "Ok"}"#)));
        assert!(tokio::time::timeout(Duration::from_secs(1), request)
            .await
            .is_err());

        tokio::time::sleep(Duration::from_secs(5)).await;
        let attempt = shared.lock().await;
        assert_eq!(attempt.overall().map(|o| o.ratings), Some(6.0));
        assert!(attempt.prepare_save(true).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_advances_then_holds_response_for_delay() {
        let sessions = sessions();
        let shared = answering(&sessions, 2).await;
        valid_take(&shared).await;
        shared.lock().await.toggle_recording(Instant::now()).unwrap();
        let written = Written::default();

        let started = Instant::now();
        let view = save_answer(&sessions, shared.clone(), true, DELAY, recording_writer(&written))
            .await
            .unwrap();

        assert!(started.elapsed() >= DELAY);
        assert_eq!(written.lock().unwrap().len(), 1);
        assert_eq!(written.lock().unwrap()[0].user_answer, LONG_ANSWER);
        assert_eq!(
            view.effects,
            vec![FlowEffect::Speak("What is Database?".to_string())]
        );
        assert!(shared.lock().await.flow().is_cross());
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_dropped_during_delay_is_not_repeated() {
        let sessions = sessions();
        let shared = answering(&sessions, 2).await;
        valid_take(&shared).await;
        shared.lock().await.toggle_recording(Instant::now()).unwrap();
        let written = Written::default();

        let request = save_answer(&sessions, shared.clone(), true, DELAY, recording_writer(&written));
        assert!(tokio::time::timeout(DELAY / 2, request).await.is_err());

        let attempt = shared.lock().await;
        assert!(attempt.flow().is_cross());
        assert!(attempt.recorder().validated_answer().is_none());
        assert!(attempt.prepare_save(true).is_err());
        assert_eq!(written.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_keeps_take_for_retry() {
        let sessions = sessions();
        let shared = answering(&sessions, 2).await;
        valid_take(&shared).await;
        shared.lock().await.toggle_recording(Instant::now()).unwrap();

        let result = save_answer(&sessions, shared.clone(), true, DELAY, |_| async {
            Err::<(), _>(AppError::Internal(anyhow!("connection reset")))
        })
        .await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        let attempt = shared.lock().await;
        assert!(!attempt.flow().is_cross());
        assert!(attempt.prepare_save(true).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_save_discards_session() {
        let sessions = sessions();
        let shared = answering(&sessions, 1).await;
        valid_take(&shared).await;
        toggle_recording(&shared, llm(Err(529))).await.unwrap();
        let written = Written::default();

        save_answer(&sessions, shared.clone(), true, DELAY, recording_writer(&written))
            .await
            .unwrap();
        {
            let mut attempt = shared.lock().await;
            attempt.speech_ended().unwrap();
        }
        valid_take(&shared).await;
        toggle_recording(&shared, llm(Err(529))).await.unwrap();

        let view = save_answer(&sessions, shared.clone(), true, DELAY, recording_writer(&written))
            .await
            .unwrap();

        assert!(view.finished);
        assert!(matches!(
            view.effects.as_slice(),
            [FlowEffect::NavigateToFeedback(_)]
        ));
        assert_eq!(written.lock().unwrap().len(), 2);
        assert_eq!(written.lock().unwrap()[1].rating, Some(0.0));
        assert_eq!(sessions.len().await, 0);
    }
}
