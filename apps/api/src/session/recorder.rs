//! Answer recorder: one spoken response per take.
//!
//! Starting a take resets the transcript and the elapsed-time counter.
//! Stopping cleans the transcript and validates it against `AnswerPolicy`;
//! only a validated take can be saved.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

/// Minimum effort before an answer counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerPolicy {
    pub min_duration: Duration,
    pub min_chars: usize,
}

impl Default for AnswerPolicy {
    fn default() -> Self {
        Self {
            min_duration: Duration::from_secs(30),
            min_chars: 30,
        }
    }
}

/// A piece of speech-to-text output. Interim pieces are superseded by the
/// next fragment; final pieces are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptFragment {
    pub text: String,
    #[serde(default)]
    pub is_final: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordingError {
    #[error("Recording is not running")]
    NotRecording,

    #[error("Stop the recording before saving")]
    StillRecording,

    #[error("Please record for at least {min_secs} seconds (recorded {elapsed_secs})")]
    TooShort { elapsed_secs: u64, min_secs: u64 },

    #[error("Your answer is too short: {chars} characters, at least {min_chars} needed")]
    TranscriptTooShort { chars: usize, min_chars: usize },

    #[error("Record a valid answer before saving")]
    NoValidAnswer,

    #[error("Overall feedback is still being prepared")]
    AwaitingEvaluation,
}

/// Result of flipping the record switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    Started,
    Stopped { answer: String },
}

#[derive(Debug, Clone)]
pub struct Recorder {
    policy: AnswerPolicy,
    started_at: Option<Instant>,
    elapsed_secs: u64,
    finals: Vec<String>,
    interim: String,
    validated: Option<String>,
}

impl Recorder {
    pub fn new(policy: AnswerPolicy) -> Self {
        Self {
            policy,
            started_at: None,
            elapsed_secs: 0,
            finals: Vec::new(),
            interim: String::new(),
            validated: None,
        }
    }

    pub fn policy(&self) -> AnswerPolicy {
        self.policy
    }

    pub fn is_recording(&self) -> bool {
        self.started_at.is_some()
    }

    /// Starts a take when idle, stops and validates it when recording.
    pub fn toggle(&mut self, now: Instant) -> Result<Toggle, RecordingError> {
        if self.is_recording() {
            self.stop(now).map(|answer| Toggle::Stopped { answer })
        } else {
            self.start(now);
            Ok(Toggle::Started)
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.reset();
        self.started_at = Some(now);
    }

    /// Ends the take. The cleaned transcript is kept either way so the user
    /// can see it, but only a passing take becomes saveable.
    pub fn stop(&mut self, now: Instant) -> Result<String, RecordingError> {
        let started_at = self.started_at.take().ok_or(RecordingError::NotRecording)?;
        self.elapsed_secs = now.saturating_duration_since(started_at).as_secs();

        let transcript = self.transcript();
        self.finals = if transcript.is_empty() {
            Vec::new()
        } else {
            vec![transcript.clone()]
        };
        self.interim.clear();

        let min_secs = self.policy.min_duration.as_secs();
        if self.elapsed_secs < min_secs {
            return Err(RecordingError::TooShort {
                elapsed_secs: self.elapsed_secs,
                min_secs,
            });
        }
        let chars = transcript.chars().count();
        if chars < self.policy.min_chars {
            return Err(RecordingError::TranscriptTooShort {
                chars,
                min_chars: self.policy.min_chars,
            });
        }

        self.validated = Some(transcript.clone());
        Ok(transcript)
    }

    /// Feeds speech-to-text output. Ignored unless recording.
    pub fn push_fragment(&mut self, fragment: TranscriptFragment) -> bool {
        if !self.is_recording() {
            return false;
        }
        if fragment.is_final {
            let text = fragment.text.trim();
            if !text.is_empty() {
                self.finals.push(text.to_string());
            }
            self.interim.clear();
        } else {
            self.interim = fragment.text;
        }
        true
    }

    /// Whole seconds recorded; frozen once the take stops.
    pub fn elapsed_secs(&self, now: Instant) -> u64 {
        match self.started_at {
            Some(started_at) => now.saturating_duration_since(started_at).as_secs(),
            None => self.elapsed_secs,
        }
    }

    /// Cleaned transcript of the current take, interim text included.
    pub fn transcript(&self) -> String {
        let mut raw = self.finals.join(" ");
        if !self.interim.trim().is_empty() {
            if !raw.is_empty() {
                raw.push(' ');
            }
            raw.push_str(self.interim.trim());
        }
        clean_transcript(&raw)
    }

    pub fn validated_answer(&self) -> Option<&str> {
        self.validated.as_deref()
    }

    /// The answer to persist, if every gate is open.
    ///
    /// `requires_overall` holds on the final question, where the overall
    /// evaluation must exist first.
    pub fn ensure_saveable(
        &self,
        requires_overall: bool,
        has_overall: bool,
    ) -> Result<&str, RecordingError> {
        if self.is_recording() {
            return Err(RecordingError::StillRecording);
        }
        let answer = self.validated.as_deref().ok_or(RecordingError::NoValidAnswer)?;
        if requires_overall && !has_overall {
            return Err(RecordingError::AwaitingEvaluation);
        }
        Ok(answer)
    }

    /// Clears transcript and timer state.
    pub fn reset(&mut self) {
        self.started_at = None;
        self.elapsed_secs = 0;
        self.finals.clear();
        self.interim.clear();
        self.validated = None;
    }
}

/// Drops literal `undefined` artifacts and collapses whitespace.
pub fn clean_transcript(raw: &str) -> String {
    raw.replace("undefined", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
