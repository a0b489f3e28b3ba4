//! One user's run through an interview: the flow, the recorder for the
//! current answer and, on the final question, the overall evaluation.

use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::interview::InterviewRow;
use crate::session::answers::NewAnswer;
use crate::session::evaluation::{EvaluationItem, OverallResult};
use crate::session::flow::{combine_answers, FlowEffect, FlowSession, Phase, Stage};
use crate::session::recorder::{AnswerPolicy, Recorder, Toggle, TranscriptFragment};

#[derive(Debug)]
pub struct Attempt {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub user_id: String,
    flow: FlowSession,
    recorder: Recorder,
    overall: Option<OverallResult>,
    /// Bumped on every started take; tags evaluation results.
    take: u64,
}

/// Outcome of the record button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingOutcome {
    Started,
    /// A valid take ended. On the final question the caller must evaluate
    /// before the answer can be saved.
    Stopped { answer: String, needs_evaluation: bool },
}

#[derive(Debug, Clone, Serialize)]
pub struct RecorderView {
    pub is_recording: bool,
    pub elapsed_secs: u64,
    pub transcript: String,
    pub answer_ready: bool,
    pub min_recording_secs: u64,
    pub min_answer_chars: usize,
}

/// Everything a client needs to render the session after an action.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub interview_id: Uuid,
    pub question_index: usize,
    pub question_count: usize,
    pub is_last_question: bool,
    pub stage: Stage,
    pub phase: Phase,
    pub prompt: String,
    pub finished: bool,
    /// Work the client performs now: speak, cancel speech, reveal the answer
    /// input or navigate to feedback with the hand-off.
    pub effects: Vec<FlowEffect>,
    pub recorder: RecorderView,
    pub overall: Option<OverallResult>,
}

impl Attempt {
    pub fn start(
        interview: &InterviewRow,
        policy: AnswerPolicy,
    ) -> Result<(Self, Vec<FlowEffect>), AppError> {
        let (flow, effects) = FlowSession::start(interview.questions.0.clone())?;
        let attempt = Self {
            id: Uuid::new_v4(),
            interview_id: interview.id,
            user_id: interview.user_id.clone(),
            flow,
            recorder: Recorder::new(policy),
            overall: None,
            take: 0,
        };
        Ok((attempt, effects))
    }

    pub fn flow(&self) -> &FlowSession {
        &self.flow
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn overall(&self) -> Option<&OverallResult> {
        self.overall.as_ref()
    }

    /// The current take; an evaluation started for it applies only to it.
    pub fn take(&self) -> u64 {
        self.take
    }

    pub fn speech_ended(&mut self) -> Result<Vec<FlowEffect>, AppError> {
        Ok(self.flow.speech_ended()?)
    }

    pub fn stop_speaking(&mut self) -> Result<Vec<FlowEffect>, AppError> {
        Ok(self.flow.stop_speaking()?)
    }

    pub fn replay(&mut self) -> Result<Vec<FlowEffect>, AppError> {
        if self.recorder.is_recording() {
            return Err(AppError::Conflict(
                "Stop the recording before replaying the question".to_string(),
            ));
        }
        Ok(self.flow.replay()?)
    }

    /// Starts a take or stops and validates the running one.
    pub fn toggle_recording(&mut self, now: Instant) -> Result<RecordingOutcome, AppError> {
        if self.flow.is_finished() || self.flow.phase() != Phase::AwaitingAnswer {
            return Err(AppError::Conflict(
                "Recording is only possible while answering".to_string(),
            ));
        }

        match self.recorder.toggle(now)? {
            Toggle::Started => {
                self.take += 1;
                if self.flow.is_last_question() {
                    self.overall = None;
                }
                Ok(RecordingOutcome::Started)
            }
            Toggle::Stopped { answer } => Ok(RecordingOutcome::Stopped {
                answer,
                needs_evaluation: self.flow.is_last_question(),
            }),
        }
    }

    /// Ignored unless a take is running.
    pub fn push_transcript(&mut self, fragment: TranscriptFragment) -> bool {
        self.recorder.push_fragment(fragment)
    }

    /// Every question paired with what the candidate has said so far. The
    /// current question uses `current_answer`, joined to the main answer when
    /// the cross-question is being answered.
    pub fn evaluation_items(&self, current_answer: &str) -> Vec<EvaluationItem> {
        let answers = self.flow.answers();
        let current = self.flow.current_index();

        self.flow
            .questions()
            .iter()
            .enumerate()
            .map(|(i, qa)| {
                let candidate_answer = if let Some(confirmed) = answers.get(i) {
                    Some(confirmed.answer.clone())
                } else if i == current {
                    Some(match self.flow.main_answer() {
                        Some(main) => combine_answers(main, current_answer),
                        None => current_answer.to_string(),
                    })
                } else {
                    None
                };
                EvaluationItem {
                    question: qa.question.clone(),
                    reference_answer: qa.answer.clone(),
                    candidate_answer,
                }
            })
            .collect()
    }

    pub fn set_overall(&mut self, result: OverallResult) {
        self.overall = Some(result);
    }

    /// Stores an evaluation made for `take`. Ignored once a newer take has
    /// started or the answer has already been saved.
    pub fn apply_overall(&mut self, take: u64, result: OverallResult) -> bool {
        if take != self.take || self.recorder.validated_answer().is_none() {
            return false;
        }
        self.set_overall(result);
        true
    }

    /// Checks every save gate without changing anything, so a failed write
    /// can simply be retried.
    pub fn prepare_save(&self, confirm: bool) -> Result<NewAnswer, AppError> {
        if !confirm {
            return Err(AppError::Validation(
                "Confirm the answer before saving".to_string(),
            ));
        }
        if self.flow.is_finished() || self.flow.phase() != Phase::AwaitingAnswer {
            return Err(AppError::Conflict(
                "There is no question awaiting an answer".to_string(),
            ));
        }

        let last = self.flow.is_last_question();
        let answer = self
            .recorder
            .ensure_saveable(last, self.overall.is_some())?;
        let overall = if last { self.overall.as_ref() } else { None };

        Ok(NewAnswer {
            interview_id: self.interview_id,
            user_id: self.user_id.clone(),
            question: self.flow.prompt().to_string(),
            reference_answer: self.flow.current_question().answer.clone(),
            user_answer: answer.to_string(),
            is_follow_up: self.flow.is_cross(),
            rating: overall.map(|o| o.ratings),
            feedback: overall.map(|o| o.feedback.clone()),
        })
    }

    /// Called once the answer is stored: clears the take and moves the flow on.
    pub fn complete_save(&mut self, answer: &str) -> Result<Vec<FlowEffect>, AppError> {
        let effects = self.flow.submit_answer(answer)?;
        self.recorder.reset();
        Ok(effects)
    }

    pub fn teardown(&mut self) -> Vec<FlowEffect> {
        self.recorder.reset();
        self.flow.teardown()
    }

    pub fn view(&self, now: Instant, effects: Vec<FlowEffect>) -> SessionView {
        let policy = self.recorder.policy();
        SessionView {
            session_id: self.id,
            interview_id: self.interview_id,
            question_index: self.flow.current_index(),
            question_count: self.flow.question_count(),
            is_last_question: self.flow.is_last_question(),
            stage: self.flow.stage().clone(),
            phase: self.flow.phase(),
            prompt: self.flow.prompt().to_string(),
            finished: self.flow.is_finished(),
            effects,
            recorder: RecorderView {
                is_recording: self.recorder.is_recording(),
                elapsed_secs: self.recorder.elapsed_secs(now),
                transcript: self.recorder.transcript(),
                answer_ready: self.recorder.validated_answer().is_some(),
                min_recording_secs: policy.min_duration.as_secs(),
                min_answer_chars: policy.min_chars,
            },
            overall: self.overall.clone(),
        }
    }
}
