use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::audio::{CaptureController, RecordingState};
use crate::error::{AgentError, AgentResult};
use crate::fallback::FallbackAnnouncer;
use crate::session::ConversationStats;
use crate::turn::{TurnPipeline, TurnResult};
use crate::ui::{StatusLevel, UiSurface};

pub const TROUBLE_PLAYING: &str = "I'm having trouble playing the response.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    WaitingToStart,
    Capturing,
    Processing,
    Playing,
}

/// What a stop trigger led to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// No recording was active
    NothingCaptured,
    /// The turn settled; `restarted` tells whether capture resumed hands-free
    Completed { result: TurnResult, restarted: bool },
    /// The user stopped the conversation while the turn was in flight
    Interrupted { result: TurnResult },
}

#[derive(Debug, Default)]
struct Tally {
    turns_completed: usize,
    degraded_turns: usize,
    last_transcription: Option<String>,
}

/// Capture -> dispatch -> playback -> capture again
///
/// Every state write that follows a suspension point is tagged with the epoch
/// observed when the operation began; `cancel` bumps the epoch so in-flight
/// work can finish without moving the loop past the user's stop.
pub struct ConversationLoop {
    capture: tokio::sync::Mutex<CaptureController>,
    pipeline: TurnPipeline,
    announcer: Arc<FallbackAnnouncer>,
    ui: UiSurface,
    hands_free: bool,
    state: watch::Sender<LoopState>,
    epoch: AtomicU64,
    started_at: DateTime<Utc>,
    tally: Mutex<Tally>,
}

impl ConversationLoop {
    pub fn new(
        capture: CaptureController,
        pipeline: TurnPipeline,
        announcer: Arc<FallbackAnnouncer>,
        ui: UiSurface,
        hands_free: bool,
    ) -> Self {
        let (state, _) = watch::channel(LoopState::WaitingToStart);
        Self {
            capture: tokio::sync::Mutex::new(capture),
            pipeline,
            announcer,
            ui,
            hands_free,
            state,
            epoch: AtomicU64::new(0),
            started_at: Utc::now(),
            tally: Mutex::new(Tally::default()),
        }
    }

    pub fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    pub fn pipeline(&self) -> &TurnPipeline {
        &self.pipeline
    }

    pub async fn recording_state(&self) -> RecordingState {
        self.capture.lock().await.state()
    }

    pub async fn device_open(&self) -> bool {
        self.capture.lock().await.device_open()
    }

    pub fn stats(&self) -> ConversationStats {
        let tally = self.tally.lock().unwrap_or_else(PoisonError::into_inner);
        ConversationStats {
            session_id: self.pipeline.session().clone(),
            mode: self.pipeline.mode(),
            state: self.state(),
            started_at: self.started_at,
            turns_completed: tally.turns_completed,
            degraded_turns: tally.degraded_turns,
            last_transcription: tally.last_transcription.clone(),
        }
    }

    /// User starts the conversation
    pub async fn start(&self) -> AgentResult<()> {
        let epoch = self.current_epoch();

        let mut rejected = None;
        self.state.send_if_modified(|state| {
            if *state == LoopState::WaitingToStart {
                *state = LoopState::Capturing;
                true
            } else {
                rejected = Some(*state);
                false
            }
        });

        match rejected {
            None => {}
            Some(LoopState::Capturing) => return Err(AgentError::AlreadyRecording),
            Some(_) => return Err(AgentError::TurnInProgress),
        }

        self.ui.clear_transcript();
        self.open_capture(epoch).await
    }

    /// Stop trigger: end the recording and run the turn
    pub async fn finish_turn(&self) -> AgentResult<TurnOutcome> {
        let epoch = self.current_epoch();

        if !self.advance(epoch, LoopState::Capturing, LoopState::Processing) {
            return match self.state() {
                LoopState::WaitingToStart => Ok(TurnOutcome::NothingCaptured),
                _ => Err(AgentError::TurnInProgress),
            };
        }

        let stopped = {
            let mut capture = self.capture.lock().await;
            match capture.stop().await {
                Ok(Some(unit)) => Ok(Some((unit, capture.await_result()))),
                other => other.map(|_| None),
            }
        };

        let (unit, awaiting) = match stopped {
            Ok(Some(captured)) => captured,
            Ok(None) => {
                self.advance(epoch, LoopState::Processing, LoopState::WaitingToStart);
                return Ok(TurnOutcome::NothingCaptured);
            }
            Err(e) => {
                error!("Failed to finish capture: {}", e);
                self.ui
                    .show_recording_status(&e.user_message(), StatusLevel::Error);
                self.advance(epoch, LoopState::Processing, LoopState::WaitingToStart);
                return Err(e);
            }
        };

        // The latch also clears if this future is dropped mid-turn
        let result = self.pipeline.run_turn(unit).await;
        drop(awaiting);

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                self.ui
                    .show_recording_status(&e.user_message(), StatusLevel::Warning);
                self.advance(epoch, LoopState::Processing, LoopState::WaitingToStart);
                return Err(e);
            }
        };

        self.record(&result);

        let Some(audio) = result.playable_audio_ref.clone() else {
            // The pipeline already announced the failure
            self.advance(epoch, LoopState::Processing, LoopState::WaitingToStart);
            return Ok(self.outcome(epoch, result, false));
        };

        if !self.advance(epoch, LoopState::Processing, LoopState::Playing) {
            info!("Conversation stopped before playback of {}", audio);
            return Ok(TurnOutcome::Interrupted { result });
        }

        let played = match &self.ui.player {
            Some(player) => player.play(&audio).await,
            None => Err(AgentError::Playback("No audio player available".to_string())),
        };

        if let Err(e) = played {
            error!("Playback of {} failed: {}", audio, e);
            self.ui
                .show_recording_status("Failed to play audio response", StatusLevel::Error);
            self.announcer.announce(TROUBLE_PLAYING).await;
            self.advance(epoch, LoopState::Playing, LoopState::WaitingToStart);
            return Ok(self.outcome(epoch, result, false));
        }

        let restarted = self.restart_after_playback(epoch).await;
        Ok(self.outcome(epoch, result, restarted))
    }

    /// Explicit user stop
    ///
    /// Releases the device if it is held and cancels any pending automatic
    /// restart. In-flight backend calls are left to finish.
    pub async fn cancel(&self) -> LoopState {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(LoopState::WaitingToStart);

        let mut capture = self.capture.lock().await;
        if capture.state() == RecordingState::Recording {
            if let Err(e) = capture.stop().await {
                warn!("Discarding capture failed: {}", e);
            }
        }

        info!("Conversation stopped by user");
        self.ui
            .show_recording_status("Conversation stopped", StatusLevel::Info);

        LoopState::WaitingToStart
    }

    async fn restart_after_playback(&self, epoch: u64) -> bool {
        if !self.hands_free || self.pipeline.is_pending() {
            self.advance(epoch, LoopState::Playing, LoopState::WaitingToStart);
            return false;
        }

        if !self.advance(epoch, LoopState::Playing, LoopState::Capturing) {
            return false;
        }

        match self.open_capture(epoch).await {
            Ok(()) => self.current_epoch() == epoch,
            Err(e) => {
                warn!("Automatic restart failed: {}", e);
                false
            }
        }
    }

    /// Open the device for a loop that has already moved to `Capturing`
    async fn open_capture(&self, epoch: u64) -> AgentResult<()> {
        let mut capture = self.capture.lock().await;

        if self.current_epoch() != epoch {
            return Ok(());
        }

        if capture.state() == RecordingState::AwaitingResult {
            self.advance(epoch, LoopState::Capturing, LoopState::WaitingToStart);
            return Err(AgentError::TurnInProgress);
        }

        match capture.start().await {
            Ok(()) => {
                if self.current_epoch() != epoch {
                    // Stopped while the device was being granted
                    if let Err(e) = capture.stop().await {
                        warn!("Discarding capture failed: {}", e);
                    }
                }
                Ok(())
            }
            Err(e) => {
                self.advance(epoch, LoopState::Capturing, LoopState::WaitingToStart);
                Err(e)
            }
        }
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Move `from` -> `to` only if no cancel happened since `epoch`
    fn advance(&self, epoch: u64, from: LoopState, to: LoopState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == from && self.epoch.load(Ordering::SeqCst) == epoch {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    fn outcome(&self, epoch: u64, result: TurnResult, restarted: bool) -> TurnOutcome {
        if self.current_epoch() == epoch {
            TurnOutcome::Completed { result, restarted }
        } else {
            TurnOutcome::Interrupted { result }
        }
    }

    fn record(&self, result: &TurnResult) {
        let mut tally = self.tally.lock().unwrap_or_else(PoisonError::into_inner);
        tally.turns_completed += 1;
        if result.degraded {
            tally.degraded_turns += 1;
        }
        if result.transcription_text.is_some() {
            tally.last_transcription = result.transcription_text.clone();
        }
    }
}
