pub mod actions;
pub mod answers;
pub mod attempt;
pub mod capture;
pub mod cross_question;
pub mod driver;
pub mod evaluation;
pub mod flow;
pub mod handlers;
pub mod prompts;
pub mod recorder;
pub mod speech;
pub mod store;

use crate::errors::AppError;
use crate::session::flow::FlowError;
use crate::session::recorder::RecordingError;

impl From<FlowError> for AppError {
    fn from(e: FlowError) -> Self {
        match e {
            FlowError::NoQuestions => AppError::UnprocessableEntity(e.to_string()),
            FlowError::EmptyAnswer => AppError::Validation(e.to_string()),
            FlowError::InvalidTransition { .. } | FlowError::Finished => {
                AppError::Conflict(e.to_string())
            }
        }
    }
}

impl From<RecordingError> for AppError {
    fn from(e: RecordingError) -> Self {
        match e {
            RecordingError::TooShort { .. }
            | RecordingError::TranscriptTooShort { .. }
            | RecordingError::NoValidAnswer => AppError::Validation(e.to_string()),
            RecordingError::NotRecording
            | RecordingError::StillRecording
            | RecordingError::AwaitingEvaluation => AppError::Conflict(e.to_string()),
        }
    }
}
