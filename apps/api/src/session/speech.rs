#![allow(dead_code)]

//! Speech capabilities. Browsers provide these natively; native clients and
//! tests plug in their own implementations.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::session::recorder::TranscriptFragment;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechError {
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Speech recognition failed: {0}")]
    Recognition(String),
}

/// Queue-of-one text-to-speech.
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Plays one utterance, replacing anything queued; resolves when playback ends.
    async fn speak(&self, text: &str) -> Result<(), SpeechError>;

    /// Stops playback immediately.
    fn cancel(&self);
}

/// Continuous speech-to-text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Begins capture; fragments arrive on the returned channel as they are recognised.
    async fn start(&self) -> Result<mpsc::UnboundedReceiver<TranscriptFragment>, SpeechError>;

    async fn stop(&self) -> Result<(), SpeechError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Finished,
    Cancelled,
}

/// Plays `text` until it ends or `token` is cancelled, whichever comes first.
/// On cancellation the speaker is told to stop.
pub async fn speak_cancellable(
    speaker: &dyn Speaker,
    text: &str,
    token: &CancellationToken,
) -> Result<PlaybackOutcome, SpeechError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => {
            speaker.cancel();
            Ok(PlaybackOutcome::Cancelled)
        }
        result = speaker.speak(text) => result.map(|_| PlaybackOutcome::Finished),
    }
}
