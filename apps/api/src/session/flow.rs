//! Interview flow state machine.
//!
//! Each question runs through two stages, `Main` then `Cross`, and each stage
//! alternates between `Speaking` (prompt being read aloud, answer UI hidden)
//! and `AwaitingAnswer`. Transitions are pure: they mutate the session and
//! return the effects the caller must perform (speak, cancel, reveal, navigate).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::interview::QuestionAnswer;
use crate::session::cross_question::derive_cross_question;

/// Joins a main answer and its follow-up into one confirmed answer.
pub const FOLLOW_UP_SEPARATOR: &str = "\n\nFollow-up: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Speaking,
    AwaitingAnswer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stage {
    Main,
    Cross {
        main_answer: String,
        cross_question: String,
    },
}

/// Work the caller performs after a transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum FlowEffect {
    Speak(String),
    CancelSpeech,
    RevealAnswer,
    NavigateToFeedback(FeedbackHandoff),
}

/// Main answer and follow-up for one question, combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedAnswer {
    pub question_index: usize,
    pub question: String,
    pub cross_question: String,
    pub answer: String,
}

/// Navigation state handed to the feedback view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackHandoff {
    pub answers: Vec<ConfirmedAnswer>,
    pub questions: Vec<QuestionAnswer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("An interview needs at least one question")]
    NoQuestions,

    #[error("Cannot {action} while {phase:?}")]
    InvalidTransition { action: &'static str, phase: Phase },

    #[error("The interview is already finished")]
    Finished,

    #[error("Answer cannot be empty")]
    EmptyAnswer,
}

#[derive(Debug, Clone)]
pub struct FlowSession {
    questions: Vec<QuestionAnswer>,
    index: usize,
    stage: Stage,
    phase: Phase,
    answers: Vec<ConfirmedAnswer>,
    finished: bool,
}

impl FlowSession {
    /// Enters the first question; the returned effects speak it.
    pub fn start(questions: Vec<QuestionAnswer>) -> Result<(Self, Vec<FlowEffect>), FlowError> {
        if questions.is_empty() {
            return Err(FlowError::NoQuestions);
        }
        let session = Self {
            questions,
            index: 0,
            stage: Stage::Main,
            phase: Phase::Speaking,
            answers: Vec::new(),
            finished: false,
        };
        let effects = vec![FlowEffect::Speak(session.prompt().to_string())];
        Ok((session, effects))
    }

    /// The text currently being asked: the question or its cross-question.
    pub fn prompt(&self) -> &str {
        match &self.stage {
            Stage::Main => &self.questions[self.index].question,
            Stage::Cross { cross_question, .. } => cross_question,
        }
    }

    pub fn current_question(&self) -> &QuestionAnswer {
        &self.questions[self.index]
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn is_last_question(&self) -> bool {
        self.index + 1 == self.questions.len()
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn is_cross(&self) -> bool {
        matches!(self.stage, Stage::Cross { .. })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn questions(&self) -> &[QuestionAnswer] {
        &self.questions
    }

    pub fn answers(&self) -> &[ConfirmedAnswer] {
        &self.answers
    }

    /// The stored main answer while the cross-question is pending.
    pub fn main_answer(&self) -> Option<&str> {
        match &self.stage {
            Stage::Main => None,
            Stage::Cross { main_answer, .. } => Some(main_answer),
        }
    }

    /// Speech synthesis finished on its own: reveal the answer UI.
    ///
    /// A late end event after a manual stop is ignored.
    pub fn speech_ended(&mut self) -> Result<Vec<FlowEffect>, FlowError> {
        self.ensure_active()?;
        match self.phase {
            Phase::Speaking => {
                self.phase = Phase::AwaitingAnswer;
                Ok(vec![FlowEffect::RevealAnswer])
            }
            Phase::AwaitingAnswer => Ok(Vec::new()),
        }
    }

    /// User cut the prompt short.
    pub fn stop_speaking(&mut self) -> Result<Vec<FlowEffect>, FlowError> {
        self.ensure_active()?;
        self.ensure_phase(Phase::Speaking, "stop speaking")?;
        self.phase = Phase::AwaitingAnswer;
        Ok(vec![FlowEffect::CancelSpeech, FlowEffect::RevealAnswer])
    }

    /// Re-speaks the current question or cross-question.
    pub fn replay(&mut self) -> Result<Vec<FlowEffect>, FlowError> {
        self.ensure_active()?;
        self.ensure_phase(Phase::AwaitingAnswer, "replay the question")?;
        self.phase = Phase::Speaking;
        Ok(vec![FlowEffect::Speak(self.prompt().to_string())])
    }

    /// Accepts the answer for the current stage and moves the flow on.
    pub fn submit_answer(&mut self, answer: &str) -> Result<Vec<FlowEffect>, FlowError> {
        self.ensure_active()?;
        self.ensure_phase(Phase::AwaitingAnswer, "submit an answer")?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(FlowError::EmptyAnswer);
        }

        match std::mem::replace(&mut self.stage, Stage::Main) {
            Stage::Main => {
                let cross_question = derive_cross_question(answer);
                self.stage = Stage::Cross {
                    main_answer: answer.to_string(),
                    cross_question: cross_question.clone(),
                };
                self.phase = Phase::Speaking;
                Ok(vec![FlowEffect::Speak(cross_question)])
            }
            Stage::Cross {
                main_answer,
                cross_question,
            } => {
                self.answers.push(ConfirmedAnswer {
                    question_index: self.index,
                    question: self.questions[self.index].question.clone(),
                    cross_question,
                    answer: combine_answers(&main_answer, answer),
                });
                Ok(self.advance())
            }
        }
    }

    /// Controller is going away; silence anything still playing.
    pub fn teardown(&mut self) -> Vec<FlowEffect> {
        let speaking = !self.finished && self.phase == Phase::Speaking;
        self.finished = true;
        self.phase = Phase::AwaitingAnswer;
        if speaking {
            vec![FlowEffect::CancelSpeech]
        } else {
            Vec::new()
        }
    }

    fn advance(&mut self) -> Vec<FlowEffect> {
        if self.is_last_question() {
            self.finished = true;
            self.phase = Phase::AwaitingAnswer;
            return vec![FlowEffect::NavigateToFeedback(FeedbackHandoff {
                answers: self.answers.clone(),
                questions: self.questions.clone(),
            })];
        }
        self.index += 1;
        self.phase = Phase::Speaking;
        vec![FlowEffect::Speak(self.prompt().to_string())]
    }

    fn ensure_active(&self) -> Result<(), FlowError> {
        if self.finished {
            Err(FlowError::Finished)
        } else {
            Ok(())
        }
    }

    fn ensure_phase(&self, expected: Phase, action: &'static str) -> Result<(), FlowError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(FlowError::InvalidTransition {
                action,
                phase: self.phase,
            })
        }
    }
}

pub fn combine_answers(main_answer: &str, follow_up: &str) -> String {
    format!("{main_answer}{FOLLOW_UP_SEPARATOR}{follow_up}")
}
