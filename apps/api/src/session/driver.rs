#![allow(dead_code)]

//! Async driver running a `FlowSession` against a real `Speaker`.
//!
//! Used by clients that own the speech hardware themselves. One playback is
//! in flight at a time; it is cancelled on stop, on teardown and when the
//! driver is dropped.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::interview::QuestionAnswer;
use crate::session::flow::{FeedbackHandoff, FlowEffect, FlowError, FlowSession, Phase};
use crate::session::speech::{speak_cancellable, PlaybackOutcome, SpeechError, Speaker};

/// User intents fed to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StopSpeaking,
    Replay,
    SubmitAnswer(String),
    Teardown,
}

/// What a view needs to render the flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowSnapshot {
    pub question_index: usize,
    pub question_count: usize,
    pub is_cross: bool,
    pub phase: Phase,
    pub prompt: String,
    pub answered: usize,
}

impl FlowSnapshot {
    pub fn of(flow: &FlowSession) -> Self {
        Self {
            question_index: flow.current_index(),
            question_count: flow.question_count(),
            is_cross: flow.is_cross(),
            phase: flow.phase(),
            prompt: flow.prompt().to_string(),
            answered: flow.answers().len(),
        }
    }
}

struct Playback {
    token: CancellationToken,
    handle: JoinHandle<Result<PlaybackOutcome, SpeechError>>,
}

impl Playback {
    fn spawn(speaker: Arc<dyn Speaker>, text: String) -> Self {
        let token = CancellationToken::new();
        let child = token.clone();
        let handle =
            tokio::spawn(async move { speak_cancellable(speaker.as_ref(), &text, &child).await });
        Self { token, handle }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub struct FlowDriver {
    flow: FlowSession,
    speaker: Arc<dyn Speaker>,
    initial: Vec<FlowEffect>,
    playback: Option<Playback>,
    snapshot: watch::Sender<FlowSnapshot>,
}

impl FlowDriver {
    pub fn start(questions: Vec<QuestionAnswer>, speaker: Arc<dyn Speaker>) -> Result<Self, FlowError> {
        let (flow, initial) = FlowSession::start(questions)?;
        let (snapshot, _) = watch::channel(FlowSnapshot::of(&flow));
        Ok(Self {
            flow,
            speaker,
            initial,
            playback: None,
            snapshot,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowSnapshot> {
        self.snapshot.subscribe()
    }

    /// Runs until the last cross-question is answered (returning the
    /// feedback hand-off) or until torn down (returning `None`).
    ///
    /// Commands that do not fit the current state are logged and ignored.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Option<FeedbackHandoff> {
        let initial = std::mem::take(&mut self.initial);
        if let Some(handoff) = self.apply(initial).await {
            return Some(handoff);
        }

        loop {
            let transition = tokio::select! {
                outcome = wait_playback(&mut self.playback), if self.playback.is_some() => {
                    self.playback = None;
                    match outcome {
                        Ok(PlaybackOutcome::Cancelled) => Ok(Vec::new()),
                        Ok(PlaybackOutcome::Finished) => self.flow.speech_ended(),
                        Err(e) => {
                            warn!("Speech playback failed, revealing answer input: {e}");
                            self.flow.speech_ended()
                        }
                    }
                }
                command = commands.recv() => match command {
                    Some(Command::StopSpeaking) => self.flow.stop_speaking(),
                    Some(Command::Replay) => self.flow.replay(),
                    Some(Command::SubmitAnswer(answer)) => self.flow.submit_answer(&answer),
                    Some(Command::Teardown) | None => {
                        let effects = self.flow.teardown();
                        self.apply(effects).await;
                        self.stop_playback().await;
                        info!("Interview flow torn down");
                        return None;
                    }
                },
            };

            match transition {
                Ok(effects) => {
                    if let Some(handoff) = self.apply(effects).await {
                        info!("Interview flow finished with {} answers", handoff.answers.len());
                        return Some(handoff);
                    }
                }
                Err(e) => warn!("Ignoring command: {e}"),
            }
        }
    }

    async fn apply(&mut self, effects: Vec<FlowEffect>) -> Option<FeedbackHandoff> {
        for effect in effects {
            match effect {
                FlowEffect::Speak(text) => {
                    self.stop_playback().await;
                    self.playback = Some(Playback::spawn(self.speaker.clone(), text));
                }
                FlowEffect::CancelSpeech => self.stop_playback().await,
                FlowEffect::RevealAnswer => {
                    debug!("Answer input revealed for question {}", self.flow.current_index() + 1)
                }
                FlowEffect::NavigateToFeedback(handoff) => {
                    self.publish();
                    return Some(handoff);
                }
            }
        }
        self.publish();
        None
    }

    async fn stop_playback(&mut self) {
        if let Some(mut playback) = self.playback.take() {
            playback.token.cancel();
            let _ = (&mut playback.handle).await;
        }
    }

    fn publish(&self) {
        self.snapshot.send_replace(FlowSnapshot::of(&self.flow));
    }
}

/// Runs a flow over `questions` without observing its snapshots.
pub async fn drive(
    questions: Vec<QuestionAnswer>,
    speaker: Arc<dyn Speaker>,
    commands: mpsc::Receiver<Command>,
) -> Result<Option<FeedbackHandoff>, FlowError> {
    Ok(FlowDriver::start(questions, speaker)?.run(commands).await)
}

async fn wait_playback(playback: &mut Option<Playback>) -> Result<PlaybackOutcome, SpeechError> {
    match playback {
        Some(playback) => match (&mut playback.handle).await {
            Ok(result) => result,
            Err(e) => Err(SpeechError::Synthesis(format!("playback task failed: {e}"))),
        },
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::session::speech::testing::FakeSpeaker;

    fn questions(n: usize) -> Vec<QuestionAnswer> {
        (1..=n)
            .map(|i| QuestionAnswer {
                question: format!("Question {i}?"),
                answer: format!("Reference {i}"),
            })
            .collect()
    }

    async fn wait_until_answering(rx: &mut watch::Receiver<FlowSnapshot>, prompt: &str) {
        rx.wait_for(|s| s.phase == Phase::AwaitingAnswer && s.prompt == prompt)
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_walks_questions_and_hands_off() {
        let speaker = Arc::new(FakeSpeaker::new(Duration::from_secs(3)));
        let driver = FlowDriver::start(questions(2), speaker.clone()).unwrap();
        let mut rx = driver.subscribe();
        let (tx, commands) = mpsc::channel(8);
        let run = tokio::spawn(driver.run(commands));

        wait_until_answering(&mut rx, "Question 1?").await;
        tx.send(Command::SubmitAnswer("We used Kubernetes".into())).await.unwrap();
        wait_until_answering(&mut rx, "What is Kubernetes?").await;
        tx.send(Command::SubmitAnswer("A container orchestrator".into())).await.unwrap();
        wait_until_answering(&mut rx, "Question 2?").await;
        tx.send(Command::SubmitAnswer("Through blue green deploys".into())).await.unwrap();
        wait_until_answering(&mut rx, "What is Deploys?").await;
        tx.send(Command::SubmitAnswer("Shipping a new version".into())).await.unwrap();

        let handoff = run.await.unwrap().expect("flow should finish");
        assert_eq!(handoff.answers.len(), 2);
        assert_eq!(
            handoff.answers[0].answer,
            "We used Kubernetes\n\nFollow-up: A container orchestrator"
        );
        assert_eq!(
            speaker.spoken(),
            vec![
                "Question 1?",
                "What is Kubernetes?",
                "Question 2?",
                "What is Deploys?"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_reveals_answer_without_waiting() {
        let speaker = Arc::new(FakeSpeaker::new(Duration::from_secs(600)));
        let driver = FlowDriver::start(questions(1), speaker.clone()).unwrap();
        let mut rx = driver.subscribe();
        let (tx, commands) = mpsc::channel(8);
        let run = tokio::spawn(driver.run(commands));

        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(Command::StopSpeaking).await.unwrap();
        wait_until_answering(&mut rx, "Question 1?").await;
        assert_eq!(speaker.cancels(), 1);

        tx.send(Command::Teardown).await.unwrap();
        assert!(run.await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_speaks_again() {
        let speaker = Arc::new(FakeSpeaker::new(Duration::from_secs(2)));
        let driver = FlowDriver::start(questions(1), speaker.clone()).unwrap();
        let mut rx = driver.subscribe();
        let (tx, commands) = mpsc::channel(8);
        let run = tokio::spawn(driver.run(commands));

        wait_until_answering(&mut rx, "Question 1?").await;
        tx.send(Command::Replay).await.unwrap();
        rx.wait_for(|s| s.phase == Phase::Speaking).await.unwrap();
        wait_until_answering(&mut rx, "Question 1?").await;
        assert_eq!(speaker.spoken(), vec!["Question 1?", "Question 1?"]);

        drop(tx);
        assert!(run.await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_playback_in_flight() {
        let speaker = Arc::new(FakeSpeaker::new(Duration::from_secs(600)));
        let driver = FlowDriver::start(questions(3), speaker.clone()).unwrap();
        let (tx, commands) = mpsc::channel(8);
        let run = tokio::spawn(driver.run(commands));

        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(Command::Teardown).await.unwrap();

        assert!(run.await.unwrap().is_none());
        assert_eq!(speaker.cancels(), 1);
    }

    #[tokio::test]
    async fn test_drive_rejects_empty_interview() {
        let speaker = Arc::new(FakeSpeaker::new(Duration::from_secs(1)));
        let (_tx, commands) = mpsc::channel(1);
        assert_eq!(
            drive(Vec::new(), speaker, commands).await,
            Err(FlowError::NoQuestions)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_turn_answer_is_ignored() {
        let speaker = Arc::new(FakeSpeaker::new(Duration::from_secs(5)));
        let driver = FlowDriver::start(questions(1), speaker.clone()).unwrap();
        let mut rx = driver.subscribe();
        let (tx, commands) = mpsc::channel(8);
        let run = tokio::spawn(driver.run(commands));

        // still speaking: rejected, flow unchanged
        tx.send(Command::SubmitAnswer("Early answer".into())).await.unwrap();
        wait_until_answering(&mut rx, "Question 1?").await;
        assert_eq!(rx.borrow().answered, 0);
        assert!(!rx.borrow().is_cross);

        tx.send(Command::Teardown).await.unwrap();
        assert!(run.await.unwrap().is_none());
    }
}
