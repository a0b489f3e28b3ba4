#![allow(dead_code)]

//! Wires a `Transcriber` to a `Recorder` for clients that capture audio themselves.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::warn;

use crate::session::recorder::{Recorder, RecordingError, Toggle, TranscriptFragment};
use crate::session::speech::{SpeechError, Transcriber};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Speech(#[from] SpeechError),

    #[error(transparent)]
    Recording(#[from] RecordingError),
}

pub struct Capture {
    transcriber: Arc<dyn Transcriber>,
    fragments: Option<mpsc::UnboundedReceiver<TranscriptFragment>>,
}

impl Capture {
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            transcriber,
            fragments: None,
        }
    }

    /// Starts or stops capture together with the recorder's take.
    ///
    /// On stop, fragments still queued are drained into the recorder before
    /// validation so nothing said at the end is lost.
    pub async fn toggle(
        &mut self,
        recorder: &mut Recorder,
        now: Instant,
    ) -> Result<Toggle, CaptureError> {
        if !recorder.is_recording() {
            let fragments = self.transcriber.start().await?;
            self.fragments = Some(fragments);
            return Ok(recorder.toggle(now)?);
        }

        if let Err(e) = self.transcriber.stop().await {
            warn!("Transcriber did not stop cleanly: {e}");
        }
        self.pump(recorder);
        self.fragments = None;
        Ok(recorder.toggle(now)?)
    }

    /// Moves every fragment already received into the recorder without waiting.
    pub fn pump(&mut self, recorder: &mut Recorder) -> usize {
        let Some(fragments) = self.fragments.as_mut() else {
            return 0;
        };
        let mut moved = 0;
        while let Ok(fragment) = fragments.try_recv() {
            recorder.push_fragment(fragment);
            moved += 1;
        }
        moved
    }

    /// Waits for the next fragment; `None` once capture is not running.
    pub async fn next_fragment(&mut self) -> Option<TranscriptFragment> {
        match self.fragments.as_mut() {
            Some(fragments) => fragments.recv().await,
            None => None,
        }
    }
}
